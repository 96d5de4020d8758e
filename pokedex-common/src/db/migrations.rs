//! Database schema migrations
//!
//! Versioned migrations tracked in the `schema_version` table. Each migration
//! runs in its own transaction together with its version row, so a crash
//! mid-migration leaves the database at the previous version.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - databases in the field already ran them
//! 2. **Always append** - a schema change is a new entry in [`MIGRATIONS`]
//! 3. **Keep statements idempotent** (`IF NOT EXISTS`) where SQLite allows it

use crate::{Error, Result};
use sqlx::SqlitePool;
use tracing::{info, warn};

/// One schema step
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub statements: &'static [&'static str],
}

/// All migrations, in ascending version order
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "create records table",
    statements: &[r#"
        CREATE TABLE IF NOT EXISTS records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            height INTEGER NOT NULL,
            weight INTEGER NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#],
}];

/// Latest schema version known to this build
pub fn current_schema_version() -> i32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Create the version tracking table if needed
pub async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Get current schema version from database
///
/// Returns 0 if no migration has been applied yet
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let version: Option<i32> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await?;

    Ok(version.unwrap_or(0))
}

/// Run all pending migrations
///
/// Safe to call on every start: applied versions are skipped, and a database
/// newer than this build is left untouched.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;

    let current_version = get_schema_version(pool).await?;
    let target_version = current_schema_version();

    if current_version == target_version {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > target_version {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, target_version
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, target_version
    );

    for migration in MIGRATIONS.iter().filter(|m| m.version > current_version) {
        apply(pool, migration).await?;
        info!(
            "✓ Migration v{} completed ({})",
            migration.version, migration.description
        );
    }

    Ok(())
}

async fn apply(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    let fail = |e: sqlx::Error| Error::Migration {
        version: migration.version,
        reason: e.to_string(),
    };

    let mut tx = pool.begin().await?;

    for statement in migration.statements {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .map_err(fail)?;
    }

    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(migration.version)
        .execute(&mut *tx)
        .await
        .map_err(fail)?;

    tx.commit().await.map_err(fail)?;
    Ok(())
}
