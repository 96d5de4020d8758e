//! Database setup for tests that need the real SQLite store

use pokedex_common::db::init::init_database;
use pokedex_lookup::services::SqliteRecordStore;
use tempfile::TempDir;

/// Fresh file-backed store; keep the `TempDir` alive for the test's duration
pub async fn create_test_store() -> (TempDir, SqliteRecordStore) {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let pool = init_database(&dir.path().join("pokedex-test.db"))
        .await
        .expect("Should initialize test database");
    (dir, SqliteRecordStore::new(pool))
}
