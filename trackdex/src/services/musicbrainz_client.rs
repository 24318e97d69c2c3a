//! MusicBrainz API client
//!
//! Recording lookup with client-side rate limiting. MusicBrainz asks
//! for at most one request per second; the limiter enforces that
//! between any two requests this client makes, and the pipeline adds
//! its own pause after every enrichment attempt.

use crate::config::USER_AGENT;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

const MUSICBRAINZ_BASE_URL: &str = "https://musicbrainz.org/ws/2";
const RATE_LIMIT_MS: u64 = 1000; // 1 request per second

/// MusicBrainz client errors
#[derive(Debug, Error)]
pub enum MusicBrainzError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Recording not found: {0}")]
    RecordingNotFound(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// MusicBrainz Recording response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MbRecording {
    /// Recording MBID
    pub id: String,
    pub title: Option<String>,
    /// Artist credits, in registry order
    #[serde(rename = "artist-credit", default)]
    pub artist_credit: Vec<MbArtistCredit>,
    /// Releases carrying this recording, in registry order
    #[serde(default)]
    pub releases: Option<Vec<MbRelease>>,
    /// Community tag list
    #[serde(default)]
    pub tags: Option<Vec<MbTag>>,
}

/// MusicBrainz artist credit
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MbArtistCredit {
    /// Credited display name (may differ from artist.name)
    pub name: String,
    /// Connective between this credit and the next ("" on the last)
    #[serde(default)]
    pub joinphrase: Option<String>,
    pub artist: MbArtist,
}

/// MusicBrainz artist
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MbArtist {
    /// Artist MBID
    pub id: String,
    pub name: String,
    #[serde(rename = "sort-name", default)]
    pub sort_name: Option<String>,
}

/// MusicBrainz release
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MbRelease {
    /// Release MBID
    pub id: String,
    pub title: String,
    /// Release date, opaque registry string (often YYYY-MM-DD)
    pub date: Option<String>,
}

/// MusicBrainz community tag
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MbTag {
    pub name: String,
    #[serde(default)]
    pub count: Option<i64>,
}

/// Rate limiter enforcing 1 request/second
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with the rate limit
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("MusicBrainz rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// MusicBrainz API client
pub struct MusicBrainzClient {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
}

impl MusicBrainzClient {
    pub fn new() -> Result<Self, MusicBrainzError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MusicBrainzError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
        })
    }

    /// Look up a recording by MBID with artist credits, releases, and
    /// tags included.
    pub async fn lookup_recording(&self, mbid: &str) -> Result<MbRecording, MusicBrainzError> {
        self.rate_limiter.wait().await;

        let url = format!(
            "{}/recording/{}?inc=artist-credits+releases+tags&fmt=json",
            MUSICBRAINZ_BASE_URL, mbid
        );

        tracing::debug!(mbid = %mbid, "querying MusicBrainz");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| MusicBrainzError::Network(e.to_string()))?;

        let status = response.status();

        if status == 404 {
            return Err(MusicBrainzError::RecordingNotFound(mbid.to_string()));
        }

        if status == 503 {
            return Err(MusicBrainzError::RateLimitExceeded);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(MusicBrainzError::Api(status.as_u16(), error_text));
        }

        let recording: MbRecording = response
            .json()
            .await
            .map_err(|e| MusicBrainzError::Parse(e.to_string()))?;

        tracing::info!(
            mbid = %mbid,
            title = recording.title.as_deref().unwrap_or("?"),
            credits = recording.artist_credit.len(),
            "retrieved recording from MusicBrainz"
        );

        Ok(recording)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        assert!(MusicBrainzClient::new().is_ok());
    }

    #[test]
    fn deserializes_recording_with_credits_releases_and_tags() {
        let recording: MbRecording = serde_json::from_str(
            r#"{
                "id": "b97b0c28-d9de-4f8e-a4f1-d4a67ef5b602",
                "title": "Around the World",
                "artist-credit": [
                    {"name": "Daft Punk", "joinphrase": "", "artist": {"id": "a1", "name": "Daft Punk", "sort-name": "Daft Punk"}}
                ],
                "releases": [
                    {"id": "r1", "title": "Homework", "date": "1997-01-20"},
                    {"id": "r2", "title": "Musique, Vol. 1", "date": "2006-03-29"}
                ],
                "tags": [
                    {"count": 12, "name": "house"},
                    {"count": 4, "name": "electronic"}
                ]
            }"#,
        )
        .expect("valid recording");

        assert_eq!(recording.artist_credit.len(), 1);
        assert_eq!(recording.artist_credit[0].artist.name, "Daft Punk");
        let releases = recording.releases.expect("releases");
        assert_eq!(releases[0].title, "Homework");
        assert_eq!(releases[0].date.as_deref(), Some("1997-01-20"));
        let tags = recording.tags.expect("tags");
        assert_eq!(tags[0].name, "house");
    }

    #[test]
    fn deserializes_sparse_recording() {
        let recording: MbRecording =
            serde_json::from_str(r#"{"id": "mbid", "title": null}"#).expect("valid recording");
        assert!(recording.artist_credit.is_empty());
        assert!(recording.releases.is_none());
        assert!(recording.tags.is_none());
    }

    #[tokio::test]
    async fn rate_limiter_spaces_requests() {
        let limiter = RateLimiter::new(100);

        let start = Instant::now();
        limiter.wait().await;
        let first = start.elapsed();
        limiter.wait().await;
        let second = start.elapsed();

        assert!(first < Duration::from_millis(50));
        assert!(second >= Duration::from_millis(90));
    }
}
