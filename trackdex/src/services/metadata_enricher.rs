//! Registry metadata enrichment
//!
//! Maps a MusicBrainz recording into the enrichment the pipeline
//! persists: artist-credit string, first release, tag list. Totally
//! best-effort — any registry failure yields the empty enrichment.

use crate::services::musicbrainz_client::{MbRecording, MusicBrainzClient, MusicBrainzError};
use crate::types::Enrichment;
use async_trait::async_trait;
use tracing::warn;

/// Registry enrichment seam. Invoked only for genuine resolved
/// identifiers; degraded identities never reach it.
#[async_trait]
pub trait MetadataEnricher: Send + Sync {
    /// Fetch richer attributes for a resolved recording.
    ///
    /// Total: failures yield `Enrichment::default()` and never cross
    /// this boundary.
    async fn enrich(&self, recording_id: &str) -> Enrichment;
}

/// Production enricher backed by the MusicBrainz registry.
pub struct MusicBrainzEnricher {
    client: MusicBrainzClient,
}

impl MusicBrainzEnricher {
    pub fn new() -> Result<Self, MusicBrainzError> {
        Ok(Self {
            client: MusicBrainzClient::new()?,
        })
    }
}

#[async_trait]
impl MetadataEnricher for MusicBrainzEnricher {
    async fn enrich(&self, recording_id: &str) -> Enrichment {
        match self.client.lookup_recording(recording_id).await {
            Ok(recording) => enrichment_from(&recording),
            Err(e) => {
                warn!(
                    mbid = %recording_id,
                    error = %e,
                    "enrichment failed, continuing without registry metadata"
                );
                Enrichment::default()
            }
        }
    }
}

/// Extract the enrichment fields from a registry recording.
///
/// Artist credits are joined with their registry-supplied join
/// phrases in registry order; the first release supplies album and
/// date (registry natural order, not filtered by type or region); the
/// full tag list becomes the genres.
pub fn enrichment_from(recording: &MbRecording) -> Enrichment {
    let artist = if recording.artist_credit.is_empty() {
        None
    } else {
        Some(
            recording
                .artist_credit
                .iter()
                .map(|credit| {
                    format!(
                        "{}{}",
                        credit.artist.name,
                        credit.joinphrase.as_deref().unwrap_or("")
                    )
                })
                .collect::<String>(),
        )
    };

    let first_release = recording
        .releases
        .as_ref()
        .and_then(|releases| releases.first());
    let album = first_release.map(|release| release.title.clone());
    let release_date = first_release.and_then(|release| release.date.clone());

    let genres = recording
        .tags
        .as_ref()
        .map(|tags| tags.iter().map(|tag| tag.name.clone()).collect())
        .unwrap_or_default();

    Enrichment {
        artist,
        album,
        release_date,
        genres,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording(json: &str) -> MbRecording {
        serde_json::from_str(json).expect("valid recording")
    }

    #[test]
    fn joins_artist_credits_in_registry_order() {
        let rec = recording(
            r#"{
                "id": "mbid",
                "title": "Collab",
                "artist-credit": [
                    {"name": "First", "joinphrase": " & ", "artist": {"id": "a1", "name": "First"}},
                    {"name": "Second", "joinphrase": " feat. ", "artist": {"id": "a2", "name": "Second"}},
                    {"name": "Third", "artist": {"id": "a3", "name": "Third"}}
                ]
            }"#,
        );

        let enrichment = enrichment_from(&rec);
        assert_eq!(
            enrichment.artist.as_deref(),
            Some("First & Second feat. Third")
        );
    }

    #[test]
    fn takes_the_first_release_only() {
        let rec = recording(
            r#"{
                "id": "mbid",
                "title": "T",
                "releases": [
                    {"id": "r1", "title": "Original Album", "date": "1997-01-20"},
                    {"id": "r2", "title": "Greatest Hits", "date": "2005-06-01"}
                ]
            }"#,
        );

        let enrichment = enrichment_from(&rec);
        assert_eq!(enrichment.album.as_deref(), Some("Original Album"));
        assert_eq!(enrichment.release_date.as_deref(), Some("1997-01-20"));
    }

    #[test]
    fn release_without_date_yields_album_only() {
        let rec = recording(
            r#"{"id": "mbid", "title": "T", "releases": [{"id": "r1", "title": "Album"}]}"#,
        );

        let enrichment = enrichment_from(&rec);
        assert_eq!(enrichment.album.as_deref(), Some("Album"));
        assert_eq!(enrichment.release_date, None);
    }

    #[test]
    fn tag_list_becomes_genres_in_order() {
        let rec = recording(
            r#"{
                "id": "mbid",
                "title": "T",
                "tags": [{"name": "house"}, {"name": "electronic"}, {"name": "french house"}]
            }"#,
        );

        let enrichment = enrichment_from(&rec);
        assert_eq!(
            enrichment.genres,
            vec!["house", "electronic", "french house"]
        );
    }

    #[test]
    fn bare_recording_yields_empty_enrichment() {
        let rec = recording(r#"{"id": "mbid", "title": "T"}"#);
        let enrichment = enrichment_from(&rec);
        assert!(enrichment.is_empty());
    }
}
