//! Embedded tag writing
//!
//! Pushes the final canonical fields into the file's tag container
//! via lofty. Best-effort relative to the persisted document: the
//! orchestrator logs and continues on any failure here, because the
//! store — not the file — is the source of truth.

use crate::types::TagUpdate;
use lofty::config::WriteOptions;
use lofty::file::TaggedFileExt;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag};
use std::path::Path;
use thiserror::Error;

/// Tag writing errors
#[derive(Debug, Error)]
pub enum TagWriteError {
    #[error("Failed to open tag container: {0}")]
    Open(String),

    #[error("Failed to write tags: {0}")]
    Write(String),
}

/// Embedded tag container seam.
pub trait TagWriter: Send + Sync {
    fn write_tags(&self, path: &Path, update: &TagUpdate) -> Result<(), TagWriteError>;
}

/// Production tag writer backed by lofty.
pub struct LoftyTagWriter;

impl TagWriter for LoftyTagWriter {
    fn write_tags(&self, path: &Path, update: &TagUpdate) -> Result<(), TagWriteError> {
        let mut tagged_file = Probe::open(path)
            .map_err(|e| TagWriteError::Open(e.to_string()))?
            .read()
            .map_err(|e| TagWriteError::Open(e.to_string()))?;

        // A container must exist before fields can be written.
        let tag_type = tagged_file.primary_tag_type();
        if tagged_file.tag(tag_type).is_none() {
            tagged_file.insert_tag(Tag::new(tag_type));
        }
        let tag = tagged_file
            .tag_mut(tag_type)
            .ok_or_else(|| TagWriteError::Open("tag container unavailable".to_string()))?;

        // Title and artist are always written; the optional fields
        // only when present, so absent enrichment never blanks an
        // existing tag value.
        tag.set_title(update.title.clone());
        tag.set_artist(update.artist.clone());

        if let Some(album) = update.album.as_deref().filter(|a| !a.is_empty()) {
            tag.set_album(album.to_string());
        }
        if !update.genres.is_empty() {
            tag.set_genre(update.genres.join("; "));
        }
        if let Some(date) = update.release_date.as_deref().filter(|d| !d.is_empty()) {
            tag.insert_text(ItemKey::RecordingDate, date.to_string());
        }

        tag.save_to_path(path, WriteOptions::default())
            .map_err(|e| TagWriteError::Write(e.to_string()))?;

        tracing::debug!(file = %path.display(), "embedded tags written");
        Ok(())
    }
}
