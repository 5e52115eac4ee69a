//! Error types for Quadrat.

use thiserror::Error;

/// Result type alias using QuadratError.
pub type Result<T> = std::result::Result<T, QuadratError>;

/// Errors that can occur in Quadrat operations.
#[derive(Debug, Error)]
pub enum QuadratError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Dataset load errors
    #[error("Dataset load failed: {0}")]
    LoadFailure(String),

    // Decode errors
    #[error("Read past end of buffer: {width} bytes at offset {offset} (buffer is {len} bytes)")]
    OutOfBounds {
        offset: usize,
        width: usize,
        len: usize,
    },

    #[error("Unsupported {field} width: {width}")]
    UnsupportedFieldWidth { field: &'static str, width: u8 },

    #[error("Corrupt dataset: {0}")]
    CorruptData(String),

    #[error("Invalid dataset metadata: {0}")]
    InvalidMetadata(String),

    // Grid reference errors
    #[error("Malformed grid reference '{reference}': {reason}")]
    MalformedReference { reference: String, reason: String },

    #[error("Unknown country code: {0}")]
    UnknownCountry(String),

    // Query errors
    #[error("Partition count mismatch: expected {expected}, got {actual}")]
    PartitionMismatch { expected: usize, actual: usize },
}

impl QuadratError {
    /// Builds a MalformedReference error for the given reference text.
    pub fn malformed(reference: &str, reason: impl Into<String>) -> Self {
        QuadratError::MalformedReference {
            reference: reference.to_string(),
            reason: reason.into(),
        }
    }
}
