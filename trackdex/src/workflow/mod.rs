//! Batch ingestion workflow
//!
//! Sequences each discovered file through duplicate-skip, stability,
//! resolution, gated enrichment, tag writing, and a single upsert;
//! then rolls per-file outcomes into a batch summary.

pub mod pipeline;

pub use pipeline::{IngestPipeline, PipelineConfig};

/// Terminal outcome for one discovered file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Document upserted; the store now records completion.
    Persisted,
    /// A document already existed for this path; nothing was done.
    SkippedDuplicate,
    /// The file was still growing; a later batch will retry it.
    SkippedUnstable,
}

/// Per-outcome counts for one batch run. A batch always ends with a
/// summary, whatever individual files did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub discovered: usize,
    pub persisted: usize,
    pub skipped_duplicate: usize,
    pub skipped_unstable: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Persisted => self.persisted += 1,
            FileOutcome::SkippedDuplicate => self.skipped_duplicate += 1,
            FileOutcome::SkippedUnstable => self.skipped_unstable += 1,
        }
    }
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} discovered, {} persisted, {} duplicate, {} unstable, {} failed",
            self.discovered,
            self.persisted,
            self.skipped_duplicate,
            self.skipped_unstable,
            self.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_records_each_outcome() {
        let mut summary = BatchSummary {
            discovered: 3,
            ..BatchSummary::default()
        };
        summary.record(FileOutcome::Persisted);
        summary.record(FileOutcome::SkippedDuplicate);
        summary.record(FileOutcome::SkippedUnstable);

        assert_eq!(summary.persisted, 1);
        assert_eq!(summary.skipped_duplicate, 1);
        assert_eq!(summary.skipped_unstable, 1);
        assert_eq!(summary.failed, 0);
    }

    #[test]
    fn summary_display_is_readable() {
        let summary = BatchSummary {
            discovered: 2,
            persisted: 1,
            failed: 1,
            ..BatchSummary::default()
        };
        assert_eq!(
            summary.to_string(),
            "2 discovered, 1 persisted, 0 duplicate, 0 unstable, 1 failed"
        );
    }
}
