//! Tiered record lookup
//!
//! Read-through over three tiers, always consulted in this order:
//!
//! 1. cache (hit → return, no write-back)
//! 2. record store (hit → write back to cache, return)
//! 3. external source (hit → insert into store, write back to cache, return)
//!
//! Only presence is cached. A not-found from the external source writes
//! nothing, so an unknown key reaches the source on every lookup.
//!
//! No transaction spans tiers. Two lookups racing on a cold key may both
//! fetch and both insert; the store's uniqueness constraint rejects the
//! loser, which then re-reads the winner's row. Optional coalescing
//! ([`InFlight`]) collapses such races into one upstream fetch.

use pokedex_common::config::CacheFailurePolicy;
use pokedex_common::{NewRecord, Record};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::cache::{cache_key, Cache, CacheError};
use super::pokeapi_client::{ExternalSource, SourceError};
use super::record_store::{RecordStore, StoreError};
use super::singleflight::InFlight;

/// Lookup failures. A definitive miss is `Ok(None)`, not an error.
#[derive(Debug, Error)]
pub enum LookupError {
    /// Bad input, rejected before any tier is touched
    #[error("Invalid lookup key: {0}")]
    Validation(String),

    /// Transient external source failure; the caller may retry later
    #[error("External source unavailable: {0}")]
    ExternalUnavailable(#[source] SourceError),

    #[error("Record store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    /// Only raised under [`CacheFailurePolicy::Strict`]
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(#[source] CacheError),

    #[error("Lookup cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Tier that produced a lookup result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Cache,
    Store,
    Source,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Cache => "cache",
            Tier::Store => "store",
            Tier::Source => "source",
        }
    }
}

/// A found record and the tier that served it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub record: Record,
    pub tier: Tier,
}

/// Canonical form of a lookup key: trimmed and lower-cased.
///
/// Idempotent. Blank keys are rejected.
pub fn normalize_key(raw: &str) -> Result<String, LookupError> {
    let key = raw.trim().to_lowercase();
    if key.is_empty() {
        return Err(LookupError::Validation("key must not be blank".to_string()));
    }
    Ok(key)
}

/// Cache → store → external source lookup with write-back population
pub struct RecordPipeline {
    cache: Arc<dyn Cache>,
    store: Arc<dyn RecordStore>,
    source: Arc<dyn ExternalSource>,
    cache_policy: CacheFailurePolicy,
    inflight: Option<InFlight>,
}

impl RecordPipeline {
    /// Pipeline with the default cache policy and no coalescing
    pub fn new(
        cache: Arc<dyn Cache>,
        store: Arc<dyn RecordStore>,
        source: Arc<dyn ExternalSource>,
    ) -> Self {
        Self {
            cache,
            store,
            source,
            cache_policy: CacheFailurePolicy::default(),
            inflight: None,
        }
    }

    pub fn with_cache_policy(mut self, policy: CacheFailurePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    /// Enable or disable per-key coalescing of cold lookups
    pub fn with_coalescing(mut self, enabled: bool) -> Self {
        self.inflight = enabled.then(InFlight::new);
        self
    }

    pub fn cache_policy(&self) -> CacheFailurePolicy {
        self.cache_policy
    }

    /// Look up a record by its user-supplied name
    pub async fn lookup(&self, raw_key: &str) -> Result<Option<Record>, LookupError> {
        Ok(self.lookup_traced(raw_key).await?.map(|found| found.record))
    }

    /// Look up a record, abandoning in-flight tier calls when `cancel` fires.
    ///
    /// A store insert that already committed stays committed.
    pub async fn lookup_with_cancel(
        &self,
        raw_key: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Lookup>, LookupError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(key = %raw_key, "Lookup cancelled by caller");
                Err(LookupError::Cancelled)
            }
            result = self.lookup_traced(raw_key) => result,
        }
    }

    /// Look up a record, reporting which tier served it
    pub async fn lookup_traced(&self, raw_key: &str) -> Result<Option<Lookup>, LookupError> {
        let key = normalize_key(raw_key)?;
        let cache_key = cache_key(&key);

        if let Some(found) = self.check_fast_tiers(&key, &cache_key).await? {
            return Ok(Some(found));
        }

        let _slot = match &self.inflight {
            Some(inflight) => {
                let slot = inflight.acquire(&key).await;
                // A holder may have finished between our miss and the acquire,
                // even when the slot was free on arrival
                if let Some(found) = self.check_fast_tiers(&key, &cache_key).await? {
                    debug!(key = %key, waited = slot.waited(), "Served by concurrent lookup");
                    return Ok(Some(found));
                }
                Some(slot)
            }
            None => None,
        };

        self.fetch_from_source(&key, &cache_key).await
    }

    async fn check_fast_tiers(
        &self,
        key: &str,
        cache_key: &str,
    ) -> Result<Option<Lookup>, LookupError> {
        if let Some(record) = self.read_cache(cache_key).await? {
            debug!(key = %key, "Cache hit");
            return Ok(Some(Lookup {
                record,
                tier: Tier::Cache,
            }));
        }

        let stored = self.store.find_by_key(key).await.map_err(|e| {
            error!(key = %key, error = %e, "Record store read failed");
            LookupError::StoreUnavailable(e)
        })?;

        match stored {
            Some(record) => {
                debug!(key = %key, id = record.id, "Store hit");
                self.write_back(cache_key, &record).await;
                Ok(Some(Lookup {
                    record,
                    tier: Tier::Store,
                }))
            }
            None => Ok(None),
        }
    }

    async fn fetch_from_source(
        &self,
        key: &str,
        cache_key: &str,
    ) -> Result<Option<Lookup>, LookupError> {
        let payload = match self.source.fetch(key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                debug!(key = %key, "Not found at external source");
                return Ok(None);
            }
            Err(e) => {
                warn!(key = %key, error = %e, "External source failed");
                return Err(LookupError::ExternalUnavailable(e));
            }
        };

        // Store under the normalized key, not the source's spelling of it
        let new_record = NewRecord::new(key, payload.height, payload.weight);

        let (record, tier) = match self.store.insert(new_record).await {
            Ok(record) => {
                info!(key = %key, id = record.id, "Persisted record from external source");
                (record, Tier::Source)
            }
            Err(StoreError::DuplicateKey(_)) => {
                info!(key = %key, "Concurrent lookup inserted first, re-reading store");
                let winner = self
                    .store
                    .find_by_key(key)
                    .await
                    .map_err(LookupError::StoreUnavailable)?;
                match winner {
                    Some(record) => (record, Tier::Store),
                    None => {
                        return Err(LookupError::Internal(format!(
                            "duplicate insert for {key} but no row on re-read"
                        )))
                    }
                }
            }
            Err(e) => {
                error!(key = %key, error = %e, "Record store insert failed");
                return Err(LookupError::StoreUnavailable(e));
            }
        };

        self.write_back(cache_key, &record).await;
        Ok(Some(Lookup { record, tier }))
    }

    async fn read_cache(&self, cache_key: &str) -> Result<Option<Record>, LookupError> {
        match self.cache.get(cache_key).await {
            Ok(hit) => Ok(hit),
            Err(CacheError::Corrupt { key, reason }) => {
                warn!(cache_key = %key, reason = %reason, "Ignoring corrupt cache entry");
                Ok(None)
            }
            Err(e) => match self.cache_policy {
                CacheFailurePolicy::Strict => {
                    error!(cache_key = %cache_key, error = %e, "Cache read failed");
                    Err(LookupError::CacheUnavailable(e))
                }
                CacheFailurePolicy::Degrade => {
                    warn!(cache_key = %cache_key, error = %e, "Cache read failed, bypassing cache");
                    Ok(None)
                }
            },
        }
    }

    /// Best effort: the record is already a valid answer
    async fn write_back(&self, cache_key: &str, record: &Record) {
        if let Err(e) = self.cache.set(cache_key, record).await {
            warn!(cache_key = %cache_key, error = %e, "Cache write-back failed");
        }
    }
}
