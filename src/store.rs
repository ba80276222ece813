use crate::error::{StoreError, SubmitError};
use crate::pledge::{NewPledge, Pledge};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::stream::{self, Stream, StreamExt};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

const ID_LEN: usize = 20;

#[async_trait]
pub trait PledgeStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Vec<Pledge>, StoreError>;

    /// Appends a pledge; the store assigns `id` and `created_at`.
    async fn insert(&self, pledge: NewPledge) -> Result<Pledge, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;

    async fn latest(&self, limit: usize) -> Result<Vec<Pledge>, StoreError>;

    fn subscribe(&self, limit: usize) -> Subscription;
}

#[derive(Debug, Clone)]
pub struct Subscription {
    rx: watch::Receiver<Vec<Pledge>>,
    limit: usize,
}

impl Subscription {
    pub fn new(rx: watch::Receiver<Vec<Pledge>>, limit: usize) -> Self {
        Self { rx, limit }
    }

    pub fn current(&self) -> Vec<Pledge> {
        self.rx.borrow().iter().take(self.limit).cloned().collect()
    }

    pub async fn changed(&mut self) -> Option<Vec<Pledge>> {
        self.rx.changed().await.ok()?;
        Some(self.current())
    }

    pub fn into_stream(self) -> impl Stream<Item = Vec<Pledge>> + Send {
        let first = self.current();
        stream::once(async move { first }).chain(stream::unfold(self, |mut sub| async move {
            let snapshot = sub.changed().await?;
            Some((snapshot, sub))
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StoredTimestamp {
    Server {
        #[serde(alias = "_seconds")]
        seconds: i64,
        #[serde(default, alias = "_nanoseconds")]
        nanoseconds: u32,
    },
    Millis(i64),
    Text(String),
}

impl StoredTimestamp {
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            StoredTimestamp::Server {
                seconds,
                nanoseconds,
            } => Utc.timestamp_opt(*seconds, *nanoseconds).single(),
            StoredTimestamp::Millis(millis) => Utc.timestamp_millis_opt(*millis).single(),
            StoredTimestamp::Text(text) => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|parsed| parsed.with_timezone(&Utc)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredPledge {
    id: Option<String>,
    username: String,
    message: String,
    timestamp: Option<StoredTimestamp>,
    #[serde(default)]
    profile_url: String,
    created_at: Option<StoredTimestamp>,
    #[serde(default)]
    likes: u32,
    #[serde(default)]
    is_verified: bool,
}

impl StoredPledge {
    fn into_pledge(self) -> Option<Pledge> {
        let created_at = self.created_at.as_ref().and_then(StoredTimestamp::to_datetime);
        let timestamp = self
            .timestamp
            .as_ref()
            .and_then(StoredTimestamp::to_datetime)
            .or(created_at)?;
        Some(Pledge {
            id: Some(self.id.unwrap_or_else(new_id)),
            username: self.username,
            message: self.message,
            timestamp,
            profile_url: self.profile_url,
            created_at: Some(created_at.unwrap_or(timestamp)),
            likes: self.likes,
            is_verified: self.is_verified,
        })
    }
}

/// Parses a stored JSON array, skipping records that cannot be normalized.
pub fn parse_records(contents: &str) -> Result<Vec<Pledge>, StoreError> {
    parse_stored(contents).map(|(pledges, _)| pledges)
}

fn parse_stored(contents: &str) -> Result<(Vec<Pledge>, usize), StoreError> {
    let raw: Vec<serde_json::Value> =
        serde_json::from_str(contents).map_err(|err| StoreError::Unavailable(err.to_string()))?;
    let mut pledges = Vec::with_capacity(raw.len());
    let mut assigned = 0;
    for (index, value) in raw.into_iter().enumerate() {
        match serde_json::from_value::<StoredPledge>(value) {
            Ok(stored) => {
                let missing_id = stored.id.is_none();
                match stored.into_pledge() {
                    Some(pledge) => {
                        assigned += usize::from(missing_id);
                        pledges.push(pledge);
                    }
                    None => warn!(index, "skipping stored pledge without a usable timestamp"),
                }
            }
            Err(error) => warn!(index, %error, "skipping malformed stored pledge"),
        }
    }
    Ok((pledges, assigned))
}

fn new_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

/// Newest `created_at` first; among equal instants the later insert wins.
fn ordered(records: &[Pledge]) -> Vec<Pledge> {
    let mut sorted: Vec<Pledge> = records.iter().rev().cloned().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sorted
}

pub struct MemoryStore {
    records: Mutex<Vec<Pledge>>,
    snapshot: watch::Sender<Vec<Pledge>>,
    path: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_records(Vec::new(), None)
    }

    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let (records, assigned) = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => parse_stored(&contents)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => (Vec::new(), 0),
            Err(err) => {
                return Err(StoreError::Unavailable(format!(
                    "{}: {err}",
                    path.display()
                )));
            }
        };
        debug!(path = %path.display(), records = records.len(), "opened pledge store");
        let store = Self::with_records(records, Some(path));
        // Ids handed out here must survive into the next process.
        if assigned > 0 {
            info!(assigned, "persisting ids for records stored without one");
            let records = store.records.lock().await.clone();
            store.commit(&records).await?;
        }
        Ok(store)
    }

    fn with_records(records: Vec<Pledge>, path: Option<PathBuf>) -> Self {
        let (snapshot, _) = watch::channel(ordered(&records));
        Self {
            records: Mutex::new(records),
            snapshot,
            path,
        }
    }

    async fn commit(&self, records: &[Pledge]) -> Result<(), StoreError> {
        if let Some(path) = &self.path {
            let json = serde_json::to_vec_pretty(records)
                .map_err(|err| StoreError::Persist(err.to_string()))?;
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|err| StoreError::Persist(err.to_string()))?;
            }
            tokio::fs::write(path, json)
                .await
                .map_err(|err| StoreError::Persist(format!("{}: {err}", path.display())))?;
        }
        self.snapshot.send_replace(ordered(records));
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PledgeStore for MemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Vec<Pledge>, StoreError> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter(|pledge| pledge.username == username)
            .cloned()
            .collect())
    }

    async fn insert(&self, pledge: NewPledge) -> Result<Pledge, StoreError> {
        let stored = Pledge {
            id: Some(new_id()),
            username: pledge.username,
            message: pledge.message,
            timestamp: pledge.timestamp,
            profile_url: pledge.profile_url,
            created_at: Some(Utc::now()),
            likes: 0,
            is_verified: false,
        };
        let mut records = self.records.lock().await;
        records.push(stored.clone());
        if let Err(err) = self.commit(&records).await {
            records.pop();
            return Err(err);
        }
        Ok(stored)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        let index = records
            .iter()
            .position(|pledge| pledge.id.as_deref() == Some(id))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let removed = records.remove(index);
        if let Err(err) = self.commit(&records).await {
            records.insert(index, removed);
            return Err(err);
        }
        Ok(())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.records.lock().await.len())
    }

    async fn latest(&self, limit: usize) -> Result<Vec<Pledge>, StoreError> {
        let records = self.records.lock().await;
        let mut sorted = ordered(&records);
        sorted.truncate(limit);
        Ok(sorted)
    }

    fn subscribe(&self, limit: usize) -> Subscription {
        Subscription::new(self.snapshot.subscribe(), limit)
    }
}

#[derive(Clone)]
pub struct PledgeService {
    store: Arc<dyn PledgeStore>,
}

impl PledgeService {
    pub fn new(store: Arc<dyn PledgeStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn PledgeStore> {
        &self.store
    }

    /// A failed lookup counts as "not pledged yet" so a flaky read never
    /// blocks a submission.
    pub async fn has_pledged(&self, username: &str) -> bool {
        match self.store.find_by_username(username).await {
            Ok(existing) => !existing.is_empty(),
            Err(error) => {
                warn!(username, %error, "pledge lookup failed, allowing submission");
                false
            }
        }
    }

    /// Check-then-insert. The two steps are not atomic; two concurrent
    /// submitters with the same username can both get through.
    pub async fn submit(&self, pledge: NewPledge) -> Result<Pledge, SubmitError> {
        if self.has_pledged(&pledge.username).await {
            return Err(SubmitError::Duplicate {
                username: pledge.username,
            });
        }
        let stored = self.store.insert(pledge).await?;
        info!(
            username = %stored.username,
            id = stored.id.as_deref().unwrap_or_default(),
            "pledge saved"
        );
        Ok(stored)
    }

    pub async fn recent(&self, limit: usize) -> Result<Vec<Pledge>, StoreError> {
        self.store.latest(limit).await
    }

    pub async fn count(&self) -> usize {
        self.store.count().await.unwrap_or_else(|error| {
            warn!(%error, "pledge count failed");
            0
        })
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(id).await?;
        info!(id, "pledge deleted");
        Ok(())
    }

    pub fn subscribe(&self, limit: usize) -> Subscription {
        self.store.subscribe(limit)
    }
}
