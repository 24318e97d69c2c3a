//! Audio property inspection
//!
//! Derives the document's audio features (duration, bitrate) from the
//! file via lofty. Runs once per ingestion; the persisted features
//! are immutable for the lifetime of the document.

use crate::error::{Error, Result};
use crate::types::AudioFeatures;
use lofty::prelude::*;
use lofty::probe::Probe;
use std::path::Path;

/// Audio property inspection seam. An inspection failure is fatal for
/// the file being ingested (unreadable audio means nothing sensible
/// can be persisted), but never for the batch.
pub trait AudioInspector: Send + Sync {
    fn inspect(&self, path: &Path) -> Result<AudioFeatures>;
}

/// Production inspector backed by lofty's format probing.
pub struct LoftyAudioInspector;

impl AudioInspector for LoftyAudioInspector {
    fn inspect(&self, path: &Path) -> Result<AudioFeatures> {
        let tagged_file = Probe::open(path)
            .map_err(|e| Error::Audio(format!("{}: {}", path.display(), e)))?
            .read()
            .map_err(|e| Error::Audio(format!("{}: {}", path.display(), e)))?;

        let properties = tagged_file.properties();
        let features = AudioFeatures {
            duration_seconds: properties.duration().as_secs() as i64,
            bitrate_kbps: properties.audio_bitrate().unwrap_or(0) as i64,
        };

        tracing::debug!(
            file = %path.display(),
            duration_s = features.duration_seconds,
            bitrate_kbps = features.bitrate_kbps,
            "inspected audio properties"
        );

        Ok(features)
    }
}
