//! File stability detection
//!
//! Ingestion races the downloader that produces these files: a file
//! still being written must not be fingerprinted or tagged. Two size
//! reads separated by a timed suspension decide whether the file has
//! settled.

use crate::error::Result;
use std::path::Path;
use std::time::Duration;

/// Default wait between the two size reads.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct StabilityDetector {
    wait: Duration,
}

impl StabilityDetector {
    pub fn new(wait: Duration) -> Self {
        Self { wait }
    }

    /// True iff the file size is unchanged across the wait window.
    ///
    /// A file that disappears between (or before) the reads is a hard
    /// error for that file: it signals a racing deletion the caller
    /// must surface, not swallow.
    pub async fn is_stable(&self, path: &Path) -> Result<bool> {
        let size_before = tokio::fs::metadata(path).await?.len();
        tokio::time::sleep(self.wait).await;
        let size_after = tokio::fs::metadata(path).await?.len();

        if size_before != size_after {
            tracing::debug!(
                file = %path.display(),
                size_before,
                size_after,
                "file size changed during stability window"
            );
        }

        Ok(size_before == size_after)
    }
}

impl Default for StabilityDetector {
    fn default() -> Self {
        Self::new(DEFAULT_WAIT)
    }
}
