//! Track document persistence
//!
//! The upsert here is the single point of persistence for a file's
//! processing: a conflicting row is replaced field-for-field, never
//! merged, so re-ingesting a path yields exactly the new document.

use crate::error::{Error, Result};
use crate::types::{AudioFeatures, TrackDocument};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

/// Idempotent upsert keyed by the document's canonical path.
pub async fn upsert_track(pool: &SqlitePool, doc: &TrackDocument) -> Result<()> {
    let genres = to_json(&doc.genres)?;
    let genres_normalized = to_json(&doc.genres_normalized)?;

    sqlx::query(
        r#"
        INSERT INTO tracks (
            path, resolved_id, title, artist, album,
            title_normalized, artist_normalized, album_normalized,
            genres, genres_normalized, release_date,
            duration_seconds, bitrate_kbps,
            confidence_score, external_id, ingested_at, notes
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(path) DO UPDATE SET
            resolved_id = excluded.resolved_id,
            title = excluded.title,
            artist = excluded.artist,
            album = excluded.album,
            title_normalized = excluded.title_normalized,
            artist_normalized = excluded.artist_normalized,
            album_normalized = excluded.album_normalized,
            genres = excluded.genres,
            genres_normalized = excluded.genres_normalized,
            release_date = excluded.release_date,
            duration_seconds = excluded.duration_seconds,
            bitrate_kbps = excluded.bitrate_kbps,
            confidence_score = excluded.confidence_score,
            external_id = excluded.external_id,
            ingested_at = excluded.ingested_at,
            notes = excluded.notes
        "#,
    )
    .bind(&doc.path)
    .bind(&doc.resolved_id)
    .bind(&doc.title)
    .bind(&doc.artist)
    .bind(&doc.album)
    .bind(&doc.title_normalized)
    .bind(&doc.artist_normalized)
    .bind(&doc.album_normalized)
    .bind(genres)
    .bind(genres_normalized)
    .bind(&doc.release_date)
    .bind(doc.audio_features.duration_seconds)
    .bind(doc.audio_features.bitrate_kbps)
    .bind(doc.confidence_score)
    .bind(&doc.external_id)
    .bind(doc.ingested_at.to_rfc3339())
    .bind(&doc.notes)
    .execute(pool)
    .await?;

    Ok(())
}

/// Whether a document already exists for this path. This is the
/// duplicate-skip check: the store itself is the record of completion.
pub async fn track_exists(pool: &SqlitePool, path: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tracks WHERE path = ?")
        .bind(path)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Load a track document by its path key.
pub async fn load_track_by_path(
    pool: &SqlitePool,
    path: &str,
) -> Result<Option<TrackDocument>> {
    let row = sqlx::query(
        r#"
        SELECT path, resolved_id, title, artist, album,
               title_normalized, artist_normalized, album_normalized,
               genres, genres_normalized, release_date,
               duration_seconds, bitrate_kbps,
               confidence_score, external_id, ingested_at, notes
        FROM tracks
        WHERE path = ?
        "#,
    )
    .bind(path)
    .fetch_optional(pool)
    .await?;

    row.map(document_from_row).transpose()
}

/// Count all persisted track documents.
pub async fn count_tracks(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tracks")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

fn document_from_row(row: sqlx::sqlite::SqliteRow) -> Result<TrackDocument> {
    let genres: Vec<String> = from_json(row.get("genres"))?;
    let genres_normalized: Vec<String> = from_json(row.get("genres_normalized"))?;

    let ingested_at_raw: String = row.get("ingested_at");
    let ingested_at = DateTime::parse_from_rfc3339(&ingested_at_raw)
        .map_err(|e| Error::Internal(format!("bad ingested_at timestamp: {}", e)))?
        .with_timezone(&Utc);

    Ok(TrackDocument {
        path: row.get("path"),
        resolved_id: row.get("resolved_id"),
        title: row.get("title"),
        artist: row.get("artist"),
        album: row.get("album"),
        title_normalized: row.get("title_normalized"),
        artist_normalized: row.get("artist_normalized"),
        album_normalized: row.get("album_normalized"),
        genres,
        genres_normalized,
        release_date: row.get("release_date"),
        audio_features: AudioFeatures {
            duration_seconds: row.get("duration_seconds"),
            bitrate_kbps: row.get("bitrate_kbps"),
        },
        confidence_score: row.get("confidence_score"),
        external_id: row.get("external_id"),
        ingested_at,
        notes: row.get("notes"),
    })
}

fn to_json(values: &[String]) -> Result<String> {
    serde_json::to_string(values).map_err(|e| Error::Internal(e.to_string()))
}

fn from_json(raw: String) -> Result<Vec<String>> {
    serde_json::from_str(&raw).map_err(|e| Error::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Enrichment, Resolution};
    use std::path::Path;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("in-memory database");
        crate::db::init_tables(&pool).await.expect("schema");
        pool
    }

    fn document(path: &str, genres: &[&str]) -> TrackDocument {
        let resolution = Resolution::Found {
            recording_id: "mbid-1".to_string(),
            title: Some("Title".to_string()),
            artist: Some("Artist".to_string()),
            score: 0.9,
        };
        let enrichment = Enrichment {
            artist: None,
            album: Some("Album".to_string()),
            release_date: Some("1997-01-20".to_string()),
            genres: genres.iter().map(|g| g.to_string()).collect(),
        };
        TrackDocument::assemble(
            Path::new(path),
            &resolution,
            &enrichment,
            AudioFeatures {
                duration_seconds: 200,
                bitrate_kbps: 320,
            },
        )
    }

    #[tokio::test]
    async fn upsert_then_load_roundtrips() {
        let pool = test_pool().await;
        let doc = document("/music/a.mp3", &["rock"]);

        upsert_track(&pool, &doc).await.expect("upsert");

        let loaded = load_track_by_path(&pool, "/music/a.mp3")
            .await
            .expect("load")
            .expect("present");
        assert_eq!(loaded, doc);
    }

    #[tokio::test]
    async fn reingest_replaces_the_document_wholesale() {
        let pool = test_pool().await;

        upsert_track(&pool, &document("/music/a.mp3", &["rock"]))
            .await
            .expect("first upsert");
        upsert_track(&pool, &document("/music/a.mp3", &["jazz", "fusion"]))
            .await
            .expect("second upsert");

        let loaded = load_track_by_path(&pool, "/music/a.mp3")
            .await
            .expect("load")
            .expect("present");
        // Replaced, not merged: the old genre list is gone entirely.
        assert_eq!(loaded.genres, vec!["jazz", "fusion"]);
        assert_eq!(loaded.genres_normalized, vec!["jazz", "fusion"]);
        assert_eq!(count_tracks(&pool).await.expect("count"), 1);
    }

    #[tokio::test]
    async fn exists_reflects_the_store() {
        let pool = test_pool().await;
        assert!(!track_exists(&pool, "/music/a.mp3").await.expect("exists"));

        upsert_track(&pool, &document("/music/a.mp3", &[]))
            .await
            .expect("upsert");
        assert!(track_exists(&pool, "/music/a.mp3").await.expect("exists"));
        assert!(!track_exists(&pool, "/music/b.mp3").await.expect("exists"));
    }

    #[tokio::test]
    async fn distinct_paths_get_distinct_rows() {
        let pool = test_pool().await;
        upsert_track(&pool, &document("/music/a.mp3", &[]))
            .await
            .expect("upsert a");
        upsert_track(&pool, &document("/music/b.mp3", &[]))
            .await
            .expect("upsert b");
        assert_eq!(count_tracks(&pool).await.expect("count"), 2);
    }

    #[tokio::test]
    async fn nullable_fields_roundtrip() {
        let pool = test_pool().await;
        let doc = TrackDocument::assemble(
            Path::new("/music/track07.mp3"),
            &Resolution::fallback_for(Path::new("/music/track07.mp3")),
            &Enrichment::default(),
            AudioFeatures {
                duration_seconds: 100,
                bitrate_kbps: 128,
            },
        );
        upsert_track(&pool, &doc).await.expect("upsert");

        let loaded = load_track_by_path(&pool, "/music/track07.mp3")
            .await
            .expect("load")
            .expect("present");
        assert_eq!(loaded.resolved_id, "file:track07");
        assert_eq!(loaded.album, None);
        assert_eq!(loaded.confidence_score, None);
        assert_eq!(loaded.release_date, None);
    }
}
