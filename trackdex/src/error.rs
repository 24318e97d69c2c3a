//! Common error types for trackdex

use thiserror::Error;

/// Common result type for trackdex operations
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level error type.
///
/// Per-service failures (fingerprinting, lookup, enrichment, tag
/// writing) carry their own error enums and are absorbed at the stage
/// boundary; only failures that must cross stages end up here.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Audio file could not be inspected
    #[error("Audio error: {0}")]
    Audio(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this failure must abort the whole batch.
    ///
    /// Storage unavailability stops the run: no partial-document
    /// writes are attempted once the store cannot be reached. Every
    /// other error is fatal only for the file that produced it.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(self, Error::Database(_))
    }
}
