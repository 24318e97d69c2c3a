//! trackdex - audio ingestion and indexing service
//!
//! Ingests newly-downloaded audio files: waits for each file to
//! settle, identifies it via acoustic fingerprint against
//! AcoustID/MusicBrainz (degrading to a file-name identity when
//! identification fails), writes the resolved metadata back into the
//! file's embedded tags, and records one canonical document per file
//! path in a SQLite store. Re-running a batch is idempotent: already
//! indexed files are skipped, everything else is replaced wholesale.

pub mod config;
pub mod db;
pub mod error;
pub mod normalize;
pub mod services;
pub mod types;
pub mod workflow;

pub use crate::error::{Error, Result};
