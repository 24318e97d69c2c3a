//! AcoustID lookup client
//!
//! Submits a fingerprint plus duration and returns the service's
//! ranked candidate list. Candidate selection policy lives in
//! [`first_match`]: only the first usable candidate is kept.

use crate::config::USER_AGENT;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

const ACOUSTID_BASE_URL: &str = "https://api.acoustid.org/v2/lookup";
const RATE_LIMIT_MS: u64 = 334; // 3 requests per second

/// AcoustID client errors
#[derive(Debug, Error)]
pub enum AcoustIdError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("No matches found for fingerprint")]
    NoMatches,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid API key")]
    InvalidApiKey,
}

/// AcoustID lookup response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LookupResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<LookupResult>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LookupResult {
    /// AcoustID track id
    pub id: String,
    /// Match confidence, 0.0 to 1.0
    pub score: f64,
    pub recordings: Option<Vec<RecordingMatch>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecordingMatch {
    /// MusicBrainz recording id
    pub id: String,
    pub title: Option<String>,
    pub artists: Option<Vec<MatchArtist>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MatchArtist {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub joinphrase: Option<String>,
}

/// The single candidate the pipeline keeps from a lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub recording_id: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub score: f64,
}

/// Extract the first candidate that actually carries a recording.
///
/// Results are taken in service rank order; entries without
/// recordings are passed over, and everything after the first usable
/// candidate is discarded (precision over recall, no disambiguation).
pub fn first_match(response: &LookupResponse) -> Option<Candidate> {
    response.results.iter().find_map(|result| {
        let recording = result.recordings.as_ref()?.first()?;
        Some(Candidate {
            recording_id: recording.id.clone(),
            title: recording.title.clone(),
            artist: recording.artists.as_ref().map(joined_artist_names),
            score: result.score,
        })
    })
}

fn joined_artist_names(artists: &Vec<MatchArtist>) -> String {
    artists
        .iter()
        .map(|a| format!("{}{}", a.name, a.joinphrase.as_deref().unwrap_or("")))
        .collect()
}

/// Rate limiter for AcoustID (3 req/sec)
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

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("AcoustID rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// AcoustID API client
pub struct AcoustIdClient {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    api_key: String,
}

impl AcoustIdClient {
    pub fn new(api_key: String) -> Result<Self, AcoustIdError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AcoustIdError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
            api_key,
        })
    }

    /// Submit a fingerprint and duration for identification.
    pub async fn lookup(
        &self,
        fingerprint: &str,
        duration_seconds: u64,
    ) -> Result<LookupResponse, AcoustIdError> {
        self.rate_limiter.wait().await;

        let duration = duration_seconds.to_string();
        let params = [
            ("client", self.api_key.as_str()),
            ("meta", "recordings"),
            ("duration", duration.as_str()),
            ("fingerprint", fingerprint),
        ];

        tracing::debug!(duration_seconds, "querying AcoustID");

        let response = self
            .http_client
            .post(ACOUSTID_BASE_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| AcoustIdError::Network(e.to_string()))?;

        let status = response.status();

        if status == 401 {
            return Err(AcoustIdError::InvalidApiKey);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AcoustIdError::Api(status.as_u16(), error_text));
        }

        let lookup_response: LookupResponse = response
            .json()
            .await
            .map_err(|e| AcoustIdError::Parse(e.to_string()))?;

        if lookup_response.results.is_empty() {
            return Err(AcoustIdError::NoMatches);
        }

        if let Some(top) = lookup_response.results.first() {
            tracing::info!(
                acoustid = %top.id,
                score = top.score,
                recordings = top.recordings.as_ref().map(|r| r.len()).unwrap_or(0),
                "AcoustID lookup successful"
            );
        }

        Ok(lookup_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_from(json: &str) -> LookupResponse {
        serde_json::from_str(json).expect("valid lookup response")
    }

    #[test]
    fn client_creation() {
        assert!(AcoustIdClient::new("test_key".to_string()).is_ok());
    }

    #[test]
    fn first_match_takes_the_top_recording() {
        let response = response_from(
            r#"{
                "status": "ok",
                "results": [
                    {
                        "id": "acoustid-1",
                        "score": 0.95,
                        "recordings": [
                            {"id": "mbid-1", "title": "First", "artists": [{"id": "a1", "name": "Artist One"}]},
                            {"id": "mbid-2", "title": "Second"}
                        ]
                    },
                    {"id": "acoustid-2", "score": 0.40, "recordings": [{"id": "mbid-3"}]}
                ]
            }"#,
        );

        let candidate = first_match(&response).expect("candidate");
        assert_eq!(candidate.recording_id, "mbid-1");
        assert_eq!(candidate.title.as_deref(), Some("First"));
        assert_eq!(candidate.artist.as_deref(), Some("Artist One"));
        assert_eq!(candidate.score, 0.95);
    }

    #[test]
    fn first_match_skips_results_without_recordings() {
        let response = response_from(
            r#"{
                "status": "ok",
                "results": [
                    {"id": "acoustid-1", "score": 0.99},
                    {"id": "acoustid-2", "score": 0.80, "recordings": [{"id": "mbid-9", "title": "Kept"}]}
                ]
            }"#,
        );

        let candidate = first_match(&response).expect("candidate");
        assert_eq!(candidate.recording_id, "mbid-9");
        assert_eq!(candidate.score, 0.80);
    }

    #[test]
    fn first_match_joins_artist_credits_with_join_phrases() {
        let response = response_from(
            r#"{
                "status": "ok",
                "results": [
                    {
                        "id": "acoustid-1",
                        "score": 0.9,
                        "recordings": [{
                            "id": "mbid-1",
                            "title": "Collab",
                            "artists": [
                                {"id": "a1", "name": "First", "joinphrase": " feat. "},
                                {"id": "a2", "name": "Second"}
                            ]
                        }]
                    }
                ]
            }"#,
        );

        let candidate = first_match(&response).expect("candidate");
        assert_eq!(candidate.artist.as_deref(), Some("First feat. Second"));
    }

    #[test]
    fn first_match_on_empty_results_is_none() {
        let response = response_from(r#"{"status": "ok", "results": []}"#);
        assert!(first_match(&response).is_none());
    }

    #[tokio::test]
    async fn rate_limiter_spaces_requests() {
        let limiter = RateLimiter::new(100);

        let start = Instant::now();
        for _ in 0..3 {
            limiter.wait().await;
        }
        let elapsed = start.elapsed();

        // Two enforced gaps of ~100ms each.
        assert!(elapsed >= Duration::from_millis(180));
    }
}
