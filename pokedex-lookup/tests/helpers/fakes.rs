//! In-memory tier fakes with call counters and injectable failures

use async_trait::async_trait;
use pokedex_common::{NewRecord, Record};
use pokedex_lookup::services::{
    Cache, CacheError, ExternalSource, RecordStore, SourceError, SourcePayload, StoreError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Cache
// ============================================================================

#[derive(Default)]
pub struct FakeCache {
    entries: Mutex<HashMap<String, Record>>,
    gets: AtomicUsize,
    sets: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FakeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn seed(&self, key: &str, record: Record) {
        self.entries.lock().unwrap().insert(key.to_string(), record);
    }

    pub fn entry(&self, key: &str) -> Option<Record> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Cache for FakeCache {
    async fn get(&self, key: &str) -> Result<Option<Record>, CacheError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("connection refused".to_string()));
        }
        Ok(self.entry(key))
    }

    async fn set(&self, key: &str, record: &Record) -> Result<(), CacheError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("connection reset".to_string()));
        }
        self.seed(key, record.clone());
        Ok(())
    }
}

// ============================================================================
// Record store
// ============================================================================

pub struct FakeStore {
    rows: Mutex<HashMap<String, Record>>,
    next_id: AtomicI64,
    finds: AtomicUsize,
    inserts: AtomicUsize,
    unavailable: AtomicBool,
    lose_insert_race: AtomicBool,
    phantom_duplicate: AtomicBool,
    stall_next_find: Mutex<Option<Duration>>,
}

impl Default for FakeStore {
    fn default() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            finds: AtomicUsize::new(0),
            inserts: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
            lose_insert_race: AtomicBool::new(false),
            phantom_duplicate: AtomicBool::new(false),
            stall_next_find: Mutex::new(None),
        }
    }
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Next insert behaves as if a concurrent lookup committed the same key
    /// just before it
    pub fn lose_next_insert_race(&self) {
        self.lose_insert_race.store(true, Ordering::SeqCst);
    }

    /// Next insert reports `DuplicateKey` but leaves no row behind
    pub fn phantom_duplicate_next_insert(&self) {
        self.phantom_duplicate.store(true, Ordering::SeqCst);
    }

    /// Next find reads its row, then holds the (possibly stale) answer for `delay`
    pub fn stall_next_find(&self, delay: Duration) {
        *self.stall_next_find.lock().unwrap() = Some(delay);
    }

    pub fn seed(&self, record: Record) {
        self.rows.lock().unwrap().insert(record.name.clone(), record);
    }

    pub fn row(&self, key: &str) -> Option<Record> {
        self.rows.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FakeStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        self.check_available()
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<Record>, StoreError> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let row = self.row(key);

        let stall = self.stall_next_find.lock().unwrap().take();
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        Ok(row)
    }

    async fn insert(&self, record: NewRecord) -> Result<Record, StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        if self.phantom_duplicate.swap(false, Ordering::SeqCst) {
            return Err(StoreError::DuplicateKey(record.name));
        }

        let mut rows = self.rows.lock().unwrap();

        if self.lose_insert_race.swap(false, Ordering::SeqCst) {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let winner = NewRecord::new(record.name.clone(), record.height, record.weight).with_id(id);
            rows.insert(winner.name.clone(), winner);
        }

        if rows.contains_key(&record.name) {
            return Err(StoreError::DuplicateKey(record.name));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stored = record.with_id(id);
        rows.insert(stored.name.clone(), stored.clone());
        Ok(stored)
    }
}

// ============================================================================
// External source
// ============================================================================

#[derive(Default)]
pub struct FakeSource {
    payloads: Mutex<HashMap<String, SourcePayload>>,
    calls: AtomicUsize,
    transient_failure: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(self, name: &str, height: i64, weight: i64) -> Self {
        self.payloads.lock().unwrap().insert(
            name.to_string(),
            SourcePayload {
                name: name.to_string(),
                height,
                weight,
            },
        );
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn fail_transiently(&self, fail: bool) {
        self.transient_failure.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExternalSource for FakeSource {
    async fn fetch(&self, key: &str) -> Result<Option<SourcePayload>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.transient_failure.load(Ordering::SeqCst) {
            return Err(SourceError::Upstream(503, "service unavailable".to_string()));
        }

        Ok(self.payloads.lock().unwrap().get(key).cloned())
    }
}
