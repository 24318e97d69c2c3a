//! SQLite document store access
//!
//! One `tracks` row per distinct file path. The pool is a
//! process-wide resource created once at startup and passed
//! explicitly to everything that persists.

pub mod tracks;

use crate::error::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize the database connection pool, creating the database
/// file and schema when absent.
pub async fn init_db_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the tracks table if it does not exist.
///
/// Public so tests can initialize in-memory databases.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tracks (
            path TEXT PRIMARY KEY,
            resolved_id TEXT NOT NULL,
            title TEXT,
            artist TEXT NOT NULL,
            album TEXT,
            title_normalized TEXT,
            artist_normalized TEXT NOT NULL,
            album_normalized TEXT,
            genres TEXT NOT NULL DEFAULT '[]',
            genres_normalized TEXT NOT NULL DEFAULT '[]',
            release_date TEXT,
            duration_seconds INTEGER NOT NULL,
            bitrate_kbps INTEGER NOT NULL,
            confidence_score REAL,
            external_id TEXT NOT NULL,
            ingested_at TEXT NOT NULL,
            notes TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(crate::error::Error::Database)?;

    tracing::info!("Database tables initialized (tracks)");

    Ok(())
}
