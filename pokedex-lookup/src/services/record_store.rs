//! Record store
//!
//! Durable lookup by natural key and insert-returning-id, backed by the
//! `records` table whose `name` column carries a UNIQUE constraint. Callers
//! pass keys already normalized; the store never re-normalizes.

use async_trait::async_trait;
use pokedex_common::{NewRecord, Record};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::debug;

/// Record store errors
///
/// A missing record is `Ok(None)`, never an error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with this name already exists (lost a concurrent insert race)
    #[error("Duplicate record name: {0}")]
    DuplicateKey(String),

    /// Store could not be reached or the query failed
    #[error("Record store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    /// Schema setup failed
    #[error("Schema initialization failed: {0}")]
    Schema(#[from] pokedex_common::Error),
}

/// Record store contract
///
/// Implementations must be safe for concurrent use by many lookups.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create the backing schema if absent. Idempotent; never drops data.
    async fn initialize(&self) -> Result<(), StoreError>;

    /// Find the record whose name equals `key`
    async fn find_by_key(&self, key: &str) -> Result<Option<Record>, StoreError>;

    /// Persist `record`, returning it with its assigned id.
    ///
    /// Fails with [`StoreError::DuplicateKey`] instead of overwriting an
    /// existing row with the same name.
    async fn insert(&self, record: NewRecord) -> Result<Record, StoreError>;
}

/// SQLite-backed record store sharing one connection pool
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Number of rows stored under `key` (0 or 1 while the constraint holds)
    pub async fn count_by_key(&self, key: &str) -> Result<i64, StoreError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE name = ?")
            .bind(key)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::Unavailable)
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        pokedex_common::db::init_schema(&self.pool).await?;
        Ok(())
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<Record>, StoreError> {
        let row = sqlx::query_as::<_, (i64, String, i64, i64)>(
            "SELECT id, name, height, weight FROM records WHERE name = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::Unavailable)?;

        Ok(row.map(|(id, name, height, weight)| Record {
            id,
            name,
            height,
            weight,
        }))
    }

    async fn insert(&self, record: NewRecord) -> Result<Record, StoreError> {
        let result = sqlx::query("INSERT INTO records (name, height, weight) VALUES (?, ?, ?)")
            .bind(&record.name)
            .bind(record.height)
            .bind(record.weight)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) => {
                let id = done.last_insert_rowid();
                debug!(key = %record.name, id, "Inserted record");
                Ok(record.with_id(id))
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::DuplicateKey(record.name))
            }
            Err(e) => Err(StoreError::Unavailable(e)),
        }
    }
}
