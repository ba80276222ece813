use std::time::Duration;
use thiserror::Error;

/// Why a single image load did not produce a usable image.
///
/// These never cross a component boundary: the owner of the load (resolver,
/// compositor) recovers through its fallback path and only logs them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("upstream answered with status {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Request(String),
    #[error("could not read {path}: {reason}")]
    Io { path: String, reason: String },
    #[error("invalid data url: {0}")]
    DataUrl(String),
    #[error("could not decode image: {0}")]
    Decode(String),
    #[error("placeholder image ({width}x{height})")]
    Placeholder { width: u32, height: u32 },
}

/// Whole-operation failure of the badge compositor.
#[derive(Debug, Error)]
pub enum BadgeError {
    #[error("could not build badge scene: {0}")]
    Render(String),
    #[error("could not encode badge: {0}")]
    Encoding(String),
    #[error("could not save {file_name}: {source}")]
    Save {
        file_name: String,
        #[source]
        source: std::io::Error,
    },
}

impl BadgeError {
    pub fn user_message(&self) -> &'static str {
        "Could not generate badge. Please try again."
    }
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("no pledge with id {0}")]
    NotFound(String),
    #[error("could not persist pledges: {0}")]
    Persist(String),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("{username} has already made a pledge")]
    Duplicate { username: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SubmitError {
    /// Notice shown to the submitter; duplicates get their own wording.
    pub fn user_message(&self) -> &'static str {
        match self {
            SubmitError::Duplicate { .. } => {
                "You have already made a pledge! Only one pledge per user is allowed."
            }
            SubmitError::Store(_) => "Failed to submit pledge. Please try again.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("please enter your username")]
    MissingUsername,
    #[error("please enter a pledge message or generate one")]
    MissingMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_and_store_failures_read_differently() {
        let dup = SubmitError::Duplicate {
            username: "alice".to_string(),
        };
        let down = SubmitError::from(StoreError::Unavailable("offline".to_string()));
        assert_ne!(dup.user_message(), down.user_message());
        assert!(dup.to_string().contains("alice"));
    }
}
