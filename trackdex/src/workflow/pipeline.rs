//! Per-file ingestion pipeline and batch orchestration
//!
//! One file at a time: duplicate-skip → stability → inspection →
//! resolution → gated enrichment → tag write → single upsert. Each
//! stage's failure policy is fixed — degrade (resolution,
//! enrichment), log-and-continue (tag write), per-file fatal
//! (disappearance, unreadable audio), batch fatal (storage).

use crate::config::Config;
use crate::db;
use crate::error::Result;
use crate::services::audio_inspector::{AudioInspector, LoftyAudioInspector};
use crate::services::file_scanner::scan_audio_files;
use crate::services::identity_resolver::{AcoustIdResolver, IdentityResolver};
use crate::services::metadata_enricher::{MetadataEnricher, MusicBrainzEnricher};
use crate::services::stability::StabilityDetector;
use crate::services::tag_writer::{LoftyTagWriter, TagWriter};
use crate::types::{Enrichment, Resolution, TrackDocument};
use crate::workflow::{BatchSummary, FileOutcome};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Pipeline timing knobs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Wait between the two stability size reads.
    pub stability_wait: Duration,
    /// Pause after every enrichment attempt that reached the
    /// registry, before the next registry call in the batch.
    pub registry_pause: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stability_wait: crate::services::stability::DEFAULT_WAIT,
            registry_pause: Duration::from_secs(1),
        }
    }
}

/// The ingestion pipeline, holding the process-wide collaborators.
pub struct IngestPipeline {
    db: SqlitePool,
    resolver: Arc<dyn IdentityResolver>,
    enricher: Arc<dyn MetadataEnricher>,
    inspector: Arc<dyn AudioInspector>,
    tag_writer: Arc<dyn TagWriter>,
    stability: StabilityDetector,
    registry_pause: Duration,
}

impl IngestPipeline {
    pub fn new(
        db: SqlitePool,
        resolver: Arc<dyn IdentityResolver>,
        enricher: Arc<dyn MetadataEnricher>,
        inspector: Arc<dyn AudioInspector>,
        tag_writer: Arc<dyn TagWriter>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            db,
            resolver,
            enricher,
            inspector,
            tag_writer,
            stability: StabilityDetector::new(config.stability_wait),
            registry_pause: config.registry_pause,
        }
    }

    /// Build the pipeline with the production services.
    pub fn with_default_services(db: SqlitePool, config: &Config) -> Result<Self> {
        let resolver = AcoustIdResolver::new(config.acoustid_api_key.clone())
            .map_err(|e| crate::error::Error::Internal(e.to_string()))?;
        let enricher = MusicBrainzEnricher::new()
            .map_err(|e| crate::error::Error::Internal(e.to_string()))?;

        Ok(Self::new(
            db,
            Arc::new(resolver),
            Arc::new(enricher),
            Arc::new(LoftyAudioInspector),
            Arc::new(LoftyTagWriter),
            PipelineConfig {
                stability_wait: config.stability_wait,
                registry_pause: config.registry_pause,
            },
        ))
    }

    /// Run one batch over `dir`.
    ///
    /// Re-scans the directory, processes files sequentially in
    /// directory order, and always terminates with a summary. A
    /// failed file is logged and counted; only storage unavailability
    /// aborts the batch.
    pub async fn run_batch(&self, dir: &Path) -> Result<BatchSummary> {
        let files = scan_audio_files(dir);
        let mut summary = BatchSummary {
            discovered: files.len(),
            ..BatchSummary::default()
        };

        info!(dir = %dir.display(), files = files.len(), "starting ingest batch");

        for path in files {
            match self.process_file(&path).await {
                Ok(outcome) => summary.record(outcome),
                Err(e) if e.is_batch_fatal() => {
                    error!(
                        file = %path.display(),
                        error = %e,
                        "storage unavailable, aborting batch"
                    );
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        file = %path.display(),
                        error = %e,
                        "file failed, continuing with next"
                    );
                    summary.failed += 1;
                }
            }
        }

        info!(%summary, "ingest batch complete");
        Ok(summary)
    }

    /// Process a single file to a terminal outcome.
    pub async fn process_file(&self, path: &Path) -> Result<FileOutcome> {
        // The canonical absolute path is the document key.
        let canonical = tokio::fs::canonicalize(path).await?;
        let key = canonical.to_string_lossy().into_owned();

        info!(file = %canonical.display(), "processing");

        // Prior batches recorded completion in the store itself.
        if db::tracks::track_exists(&self.db, &key).await? {
            debug!(file = %canonical.display(), "already indexed, skipping");
            return Ok(FileOutcome::SkippedDuplicate);
        }

        if !self.stability.is_stable(&canonical).await? {
            info!(
                file = %canonical.display(),
                "still being written, skipping until next batch"
            );
            return Ok(FileOutcome::SkippedUnstable);
        }

        let features = self.inspector.inspect(&canonical)?;

        let resolution = self.resolver.resolve(&canonical).await;

        let enrichment = match &resolution {
            Resolution::Found { recording_id, .. } => {
                let enrichment = self.enricher.enrich(recording_id).await;
                // Registry rate policy: hold the pipeline after every
                // attempt that reached the registry, success or not.
                tokio::time::sleep(self.registry_pause).await;
                enrichment
            }
            Resolution::Fallback { .. } => Enrichment::default(),
        };

        let document = TrackDocument::assemble(&canonical, &resolution, &enrichment, features);

        // Best-effort: the document stays authoritative even when the
        // embedded tags cannot be updated.
        if let Err(e) = self.tag_writer.write_tags(&canonical, &document.tag_update()) {
            warn!(
                file = %canonical.display(),
                error = %e,
                "tag write failed, persisting document anyway"
            );
        }

        db::tracks::upsert_track(&self.db, &document).await?;

        info!(
            file = %canonical.display(),
            resolved_id = %document.resolved_id,
            degraded = resolution.is_degraded(),
            "persisted"
        );
        Ok(FileOutcome::Persisted)
    }
}
