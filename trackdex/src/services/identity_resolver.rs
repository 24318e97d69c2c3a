//! Identity resolution with graceful degradation
//!
//! Wraps fingerprinting and the AcoustID lookup behind a total
//! `resolve`: every failure mode — unreadable audio, network, quota,
//! no usable candidate — degrades to the file-name fallback identity
//! instead of propagating. Best-effort auto-tagging, single attempt
//! per file, no retries.

use crate::services::acoustid_client::{self, AcoustIdClient, AcoustIdError};
use crate::services::fingerprinter::Fingerprinter;
use crate::types::Resolution;
use async_trait::async_trait;
use std::path::Path;
use tracing::{info, warn};

/// Identity resolution seam.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve the identity of the audio file at `path`.
    ///
    /// Total: failures degrade to [`Resolution::Fallback`] internally
    /// and never cross this boundary.
    async fn resolve(&self, path: &Path) -> Resolution;
}

/// Production resolver: Chromaprint fingerprint → AcoustID lookup,
/// first candidate only.
pub struct AcoustIdResolver {
    fingerprinter: Fingerprinter,
    client: AcoustIdClient,
}

impl AcoustIdResolver {
    pub fn new(api_key: String) -> Result<Self, AcoustIdError> {
        Ok(Self {
            fingerprinter: Fingerprinter::new(),
            client: AcoustIdClient::new(api_key)?,
        })
    }
}

#[async_trait]
impl IdentityResolver for AcoustIdResolver {
    async fn resolve(&self, path: &Path) -> Resolution {
        let fingerprint = match self.fingerprinter.fingerprint_file(path) {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                warn!(
                    file = %path.display(),
                    error = %e,
                    "fingerprinting failed, using file identity"
                );
                return Resolution::fallback_for(path);
            }
        };

        let response = match self
            .client
            .lookup(&fingerprint.fingerprint, fingerprint.duration_seconds)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    file = %path.display(),
                    error = %e,
                    "AcoustID lookup failed, using file identity"
                );
                return Resolution::fallback_for(path);
            }
        };

        match acoustid_client::first_match(&response) {
            Some(candidate) => {
                info!(
                    file = %path.display(),
                    recording_id = %candidate.recording_id,
                    score = candidate.score,
                    "identity resolved"
                );
                Resolution::Found {
                    recording_id: candidate.recording_id,
                    title: candidate.title,
                    artist: candidate.artist,
                    score: candidate.score,
                }
            }
            None => {
                warn!(
                    file = %path.display(),
                    "lookup returned no usable candidate, using file identity"
                );
                Resolution::fallback_for(path)
            }
        }
    }
}
