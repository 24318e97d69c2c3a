//! Core data types for the ingestion pipeline
//!
//! The stage outputs (resolution, enrichment, audio features) are
//! explicit tagged types so the degrade-vs-propagate policy of each
//! stage is visible in its signature, and the persisted document is
//! assembled in exactly one place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::normalize::normalize;

/// Provenance tag recorded on every document this service writes.
pub const PROVENANCE_NOTE: &str = "Auto-indexed";

/// Default artist when neither lookup nor enrichment supplies one.
pub const UNKNOWN_ARTIST: &str = "Unknown";

/// Synthesized identity for a file whose resolution degraded.
pub fn fallback_id_for(path: &Path) -> String {
    format!("file:{}", file_stem(path))
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Outcome of identity resolution for one file.
///
/// `Fallback` is a valid terminal identity, not an error. The variant
/// is the enrichment gate: a degraded identity never reaches the
/// registry, and no downstream code needs to sniff identifier shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The lookup service returned a usable candidate; only the first
    /// one is kept, lower-ranked alternatives are discarded.
    Found {
        /// External recording identifier (MusicBrainz recording id).
        recording_id: String,
        title: Option<String>,
        artist: Option<String>,
        /// Lookup match confidence, 0.0 to 1.0.
        score: f64,
    },
    /// Resolution degraded; identity derived from the file name.
    Fallback {
        /// `file:<stem>` of the source file.
        fallback_id: String,
        title: String,
        artist: String,
    },
}

impl Resolution {
    /// Build the degraded identity for `path`.
    pub fn fallback_for(path: &Path) -> Self {
        Resolution::Fallback {
            fallback_id: fallback_id_for(path),
            title: file_stem(path),
            artist: UNKNOWN_ARTIST.to_string(),
        }
    }

    /// The identifier persisted as `resolved_id`. Never empty.
    pub fn resolved_id(&self) -> &str {
        match self {
            Resolution::Found { recording_id, .. } => recording_id,
            Resolution::Fallback { fallback_id, .. } => fallback_id,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Resolution::Fallback { .. })
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            Resolution::Found { score, .. } => Some(*score),
            Resolution::Fallback { .. } => None,
        }
    }
}

/// Registry enrichment for a resolved recording.
///
/// `default()` is the degraded all-empty enrichment used both when the
/// registry call fails and when resolution never produced a genuine
/// identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    /// Artist-credit string: credited artists joined by their
    /// registry-supplied join phrases, in registry order.
    pub artist: Option<String>,
    /// Title of the first release carrying the recording.
    pub album: Option<String>,
    /// Date of the first release, opaque registry string.
    pub release_date: Option<String>,
    /// Registry tag list, in registry order.
    pub genres: Vec<String>,
}

impl Enrichment {
    pub fn is_empty(&self) -> bool {
        self.artist.is_none()
            && self.album.is_none()
            && self.release_date.is_none()
            && self.genres.is_empty()
    }
}

/// Audio properties derived once from the file at ingestion time;
/// immutable for the lifetime of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub duration_seconds: i64,
    pub bitrate_kbps: i64,
}

/// Fingerprint plus decoded duration, handed to the lookup service.
#[derive(Debug, Clone)]
pub struct AudioFingerprint {
    /// Opaque fingerprint token; only the lookup service interprets it.
    pub fingerprint: String,
    pub duration_seconds: u64,
}

/// Fields destined for a file's embedded tag container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagUpdate {
    pub title: String,
    pub artist: String,
    /// Written only when present; an absent album must not blank an
    /// existing album tag.
    pub album: Option<String>,
    /// Written only when non-empty.
    pub genres: Vec<String>,
    /// Written only when present.
    pub release_date: Option<String>,
}

/// The canonical persisted document, one per distinct file path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackDocument {
    /// Canonical absolute file path; the store key.
    pub path: String,
    /// External recording id, or `file:<stem>` when degraded.
    pub resolved_id: String,
    pub title: Option<String>,
    pub artist: String,
    pub album: Option<String>,
    pub title_normalized: Option<String>,
    pub artist_normalized: String,
    pub album_normalized: Option<String>,
    pub genres: Vec<String>,
    pub genres_normalized: Vec<String>,
    pub release_date: Option<String>,
    pub audio_features: AudioFeatures,
    /// Lookup confidence; null when resolution degraded.
    pub confidence_score: Option<f64>,
    /// Provenance: the identifier the resolution produced.
    pub external_id: String,
    pub ingested_at: DateTime<Utc>,
    pub notes: String,
}

impl TrackDocument {
    /// Assemble the document from the pipeline stage outputs.
    ///
    /// Normalized fields are recomputed here and nowhere else, so
    /// `x_normalized == normalize(x)` holds for every textual field.
    /// The registry artist-credit, when present, wins over the
    /// lookup-supplied artist; the title never comes from enrichment.
    pub fn assemble(
        canonical_path: &Path,
        resolution: &Resolution,
        enrichment: &Enrichment,
        features: AudioFeatures,
    ) -> Self {
        let (title, lookup_artist) = match resolution {
            Resolution::Found { title, artist, .. } => (
                title
                    .clone()
                    .unwrap_or_else(|| file_stem(canonical_path)),
                artist.clone(),
            ),
            Resolution::Fallback { title, artist, .. } => {
                (title.clone(), Some(artist.clone()))
            }
        };

        let artist = enrichment
            .artist
            .clone()
            .filter(|a| !a.is_empty())
            .or(lookup_artist)
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

        let resolved_id = resolution.resolved_id().to_string();

        Self {
            path: canonical_path.to_string_lossy().into_owned(),
            title_normalized: Some(normalize(&title)),
            artist_normalized: normalize(&artist),
            album_normalized: enrichment.album.as_deref().map(normalize),
            genres_normalized: enrichment.genres.iter().map(|g| normalize(g)).collect(),
            title: Some(title),
            artist,
            album: enrichment.album.clone(),
            genres: enrichment.genres.clone(),
            release_date: enrichment.release_date.clone(),
            audio_features: features,
            confidence_score: resolution.score(),
            external_id: resolved_id.clone(),
            resolved_id,
            ingested_at: Utc::now(),
            notes: PROVENANCE_NOTE.to_string(),
        }
    }

    /// The fields the tag writer should push into the file.
    pub fn tag_update(&self) -> TagUpdate {
        TagUpdate {
            title: self
                .title
                .clone()
                .unwrap_or_else(|| self.resolved_id.clone()),
            artist: self.artist.clone(),
            album: self.album.clone(),
            genres: self.genres.clone(),
            release_date: self.release_date.clone(),
        }
    }
}
