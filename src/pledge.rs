use crate::error::FormError;
use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PLEDGE: &str = "pledge my allegiance to Succinct!";
const DEFAULT_PROFILE_TEMPLATE: &str = "https://unavatar.io/twitter/{username}";

/// A persisted pledge. Immutable once the store has assigned an `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pledge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub username: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub profile_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub is_verified: bool,
}

impl Pledge {
    /// Identifier used by the network view: the store id once persisted,
    /// otherwise the (unique) username.
    pub fn key(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.username)
    }
}

/// A pledge that has not been handed to the store yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPledge {
    pub username: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub profile_url: String,
}

impl NewPledge {
    /// Builds a submission from raw form input.
    pub fn from_form(
        raw_username: &str,
        raw_message: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, FormError> {
        let username = clean_username(raw_username);
        if username.is_empty() {
            return Err(FormError::MissingUsername);
        }
        let body = raw_message.trim();
        if body.is_empty() {
            return Err(FormError::MissingMessage);
        }
        Ok(Self {
            message: compose_message(&username, body),
            profile_url: default_profile_url(&username),
            username,
            timestamp: now,
        })
    }

    pub fn badge_spec(&self) -> BadgeSpec {
        BadgeSpec {
            username: self.username.clone(),
            message: self.message.clone(),
            timestamp: self.timestamp,
            profile_url: self.profile_url.clone(),
        }
    }
}

/// Read-only projection of a pledge consumed by the compositor.
#[derive(Debug, Clone, PartialEq)]
pub struct BadgeSpec {
    pub username: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub profile_url: String,
}

impl BadgeSpec {
    /// Spec for a badge downloaded straight from the form, before the pledge
    /// is submitted; an empty body falls back to the default pledge.
    pub fn preview(raw_username: &str, raw_message: &str, now: DateTime<Utc>) -> Option<Self> {
        let username = clean_username(raw_username);
        if username.is_empty() {
            return None;
        }
        Some(Self {
            message: compose_message(&username, raw_message),
            profile_url: default_profile_url(&username),
            username,
            timestamp: now,
        })
    }

    pub fn profile_source(&self) -> ProfileSource<'_> {
        ProfileSource::classify(&self.profile_url)
    }
}

impl From<&Pledge> for BadgeSpec {
    fn from(pledge: &Pledge) -> Self {
        Self {
            username: pledge.username.clone(),
            message: pledge.message.clone(),
            timestamp: pledge.timestamp,
            profile_url: pledge.profile_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSource<'a> {
    /// A `data:image/...` URL from a custom upload.
    Embedded(&'a str),
    External(&'a str),
    None,
}

impl<'a> ProfileSource<'a> {
    pub fn classify(url: &'a str) -> Self {
        let url = url.trim();
        if url.is_empty() {
            ProfileSource::None
        } else if is_embedded_image(url) {
            ProfileSource::Embedded(url)
        } else {
            ProfileSource::External(url)
        }
    }
}

pub fn is_embedded_image(url: &str) -> bool {
    url.starts_with("data:image/")
}

/// Trims whitespace and strips every leading `@`.
pub fn clean_username(raw: &str) -> String {
    raw.trim().trim_start_matches('@').trim().to_string()
}

pub fn compose_message(username: &str, body: &str) -> String {
    let body = body.trim();
    let body = if body.is_empty() { DEFAULT_PLEDGE } else { body };
    format!("I, {username}, {body}")
}

pub fn default_profile_url(username: &str) -> String {
    DEFAULT_PROFILE_TEMPLATE.replace("{username}", username)
}

const SUGGESTIONS: [&str; 25] = [
    "pledge to HODL through every dip, pump, and sideways crab market until Succinct reaches the moon!",
    "swear by the power of zero-knowledge proofs, my allegiance to Succinct and promise to never sell my bags!",
    "solemnly swear I am up to no good... except when it comes to supporting Succinct forever and always!",
    "pledge to evangelize Succinct to every normie I meet, even my grandmother who still uses Internet Explorer!",
    "swear by my diamond hands that I will remain loyal to Succinct even when my portfolio is redder than a tomato!",
    "pledge allegiance to the Succinct flag, and to the blockchain for which it stands, one ecosystem, indivisible, with gains and lambos for all!",
    "promise to defend Succinct from FUD, trolls, and paper hands with the fury of a thousand suns!",
    "pledge to stake my life, my fortune, and my sacred honor to the Succinct ecosystem... but mostly my life savings!",
    "swear to keep building, keep believing, and keep memeing for Succinct until the heat death of the universe!",
    "pledge to never fade Succinct, even if my wife's boyfriend tells me to sell!",
    "swear by the sacred scrolls of Satoshi, eternal loyalty to Succinct and all its future airdrops!",
    "solemnly swear to shill Succinct so hard that even the SEC will want to buy some bags!",
    "pledge to remain diamond handed until Succinct flips Ethereum, Bitcoin, and my ex's new relationship!",
    "promise to keep calm and Succinct on, even when the market is more volatile than my emotions!",
    "pledge to support Succinct through thick and thin, bull and bear, green and red, hopium and copium!",
    "swear to hodl my Succinct bags tighter than my grandmother holds onto her purse at the casino!",
    "pledge to be more loyal to Succinct than my dog is to treats (and that's saying something)!",
    "promise to keep the Succinct flame burning bright, even if I have to eat ramen for the next 10 years!",
    "pledge to spread Succinct gospel with the enthusiasm of a MLM mom selling essential oils!",
    "swear to remain bullish on Succinct even if the market crashes harder than my dating life!",
    "pledge to defend Succinct's honor like a knight defending their castle!",
    "swear to accumulate Succinct tokens like a dragon hoards gold!",
    "promise to be a Succinct maximalist until the stars align and we reach financial freedom!",
    "pledge to trust the process even when my portfolio looks like abstract art!",
    "swear to keep my bags packed for the moon mission, no matter how long the journey takes!",
];

/// Canned pledge body; cycles through the list.
pub fn suggestion(index: usize) -> &'static str {
    SUGGESTIONS[index % SUGGESTIONS.len()]
}

pub fn random_suggestion<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    SUGGESTIONS.choose(rng).copied().unwrap_or(DEFAULT_PLEDGE)
}

pub fn suggestions() -> &'static [&'static str] {
    &SUGGESTIONS
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn strips_leading_at_signs() {
        assert_eq!(clean_username("  @@alice "), "alice");
        assert_eq!(clean_username("al@ice"), "al@ice");
        assert_eq!(clean_username("@"), "");
    }

    #[test]
    fn form_prefixes_message() {
        let now = Utc::now();
        let pledge = NewPledge::from_form("@alice", " pledge to hodl forever! ", now).unwrap();
        assert_eq!(pledge.username, "alice");
        assert_eq!(pledge.message, "I, alice, pledge to hodl forever!");
        assert_eq!(pledge.profile_url, "https://unavatar.io/twitter/alice");
    }

    #[test]
    fn form_rejects_missing_fields() {
        let now = Utc::now();
        assert_eq!(
            NewPledge::from_form("@ ", "hi", now),
            Err(FormError::MissingUsername)
        );
        assert_eq!(
            NewPledge::from_form("bob", "   ", now),
            Err(FormError::MissingMessage)
        );
    }

    #[test]
    fn preview_uses_default_pledge() {
        let spec = BadgeSpec::preview("bob", "", Utc::now()).unwrap();
        assert_eq!(spec.message, "I, bob, pledge my allegiance to Succinct!");
        assert!(BadgeSpec::preview("@@", "x", Utc::now()).is_none());
    }

    #[test]
    fn classifies_profile_sources() {
        assert!(matches!(
            ProfileSource::classify("data:image/png;base64,AAAA"),
            ProfileSource::Embedded(_)
        ));
        assert!(matches!(
            ProfileSource::classify("https://unavatar.io/x/bob"),
            ProfileSource::External(_)
        ));
        assert_eq!(ProfileSource::classify(" "), ProfileSource::None);
    }

    #[test]
    fn suggestions_cycle() {
        assert_eq!(suggestion(0), suggestion(suggestions().len()));
        let mut rng = StdRng::seed_from_u64(7);
        assert!(suggestions().contains(&random_suggestion(&mut rng)));
    }

    #[test]
    fn pledge_round_trips_camel_case() {
        let json = r#"{
            "id": "abc",
            "username": "alice",
            "message": "I, alice, hodl",
            "timestamp": "2025-01-05T15:04:00Z",
            "profileUrl": "https://unavatar.io/x/alice",
            "isVerified": true
        }"#;
        let pledge: Pledge = serde_json::from_str(json).unwrap();
        assert_eq!(pledge.key(), "abc");
        assert!(pledge.is_verified);
        assert_eq!(pledge.likes, 0);
    }
}
