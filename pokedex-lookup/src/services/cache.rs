//! Cache tier
//!
//! Key → serialized record store. The cache is never authoritative: an entry
//! may be absent or stale, and the lookup pipeline treats any miss as
//! "consult the next tier". Entries are never expired or invalidated here.

use async_trait::async_trait;
use pokedex_common::Record;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// Prefix of every record cache key
pub const CACHE_KEY_PREFIX: &str = "record:";

/// Cache key for an already-normalized lookup key
pub fn cache_key(normalized_key: &str) -> String {
    format!("{}{}", CACHE_KEY_PREFIX, normalized_key)
}

/// Cache tier errors
///
/// A missing key is `Ok(None)`, never an error.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Backing cache could not be reached
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// Entry exists but does not decode as a record
    #[error("Corrupt cache entry {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Cache tier contract
///
/// Implementations must be safe for concurrent use by many lookups.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Fetch the record stored under `key`
    async fn get(&self, key: &str) -> Result<Option<Record>, CacheError>;

    /// Store `record` under `key`, replacing any previous entry
    async fn set(&self, key: &str, record: &Record) -> Result<(), CacheError>;
}

/// In-process cache holding records in their JSON wire format
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, String>>,
    /// 0 means unbounded
    max_entries: usize,
}

impl InMemoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(0)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Store a raw serialized value, bypassing record encoding
    pub async fn set_raw(&self, key: &str, value: String) {
        let mut entries = self.entries.write().await;
        self.make_room(&mut entries, key);
        entries.insert(key.to_string(), value);
    }

    fn make_room(&self, entries: &mut HashMap<String, String>, key: &str) {
        if self.max_entries == 0 || entries.len() < self.max_entries || entries.contains_key(key) {
            return;
        }

        // No recency tracking: any entry may go
        if let Some(victim) = entries.keys().next().cloned() {
            tracing::debug!(evicted = %victim, "Cache full, evicting entry");
            entries.remove(&victim);
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Record>, CacheError> {
        let entries = self.entries.read().await;

        let Some(raw) = entries.get(key) else {
            return Ok(None);
        };

        serde_json::from_str(raw)
            .map(Some)
            .map_err(|e| CacheError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    async fn set(&self, key: &str, record: &Record) -> Result<(), CacheError> {
        let raw = serde_json::to_string(record).map_err(|e| CacheError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        self.set_raw(key, raw).await;
        Ok(())
    }
}
