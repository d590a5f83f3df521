//! Error types for the ingestion pipeline.
//!
//! Stage failures never escape the queue: they are converted into the owning
//! entry's `Error` state using the `Display` text of these variants.

use thiserror::Error;

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors that can occur while fetching, expanding, decoding or loading files.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Download failed. The underlying cause is logged, never surfaced.
    #[error("Failed to download file")]
    FetchFailure,

    /// A reader or decoder rejected the file contents.
    #[error("{0}")]
    DecodeFailure(String),

    /// More than one project-state bundle was submitted.
    #[error("Cannot load multiple state files")]
    DuplicateStateBundle,

    /// No reader is registered for the entry's extension.
    #[error("No reader registered for extension '{extension}'")]
    NoReader { extension: String },

    /// An archive could not be opened or read.
    #[error("failed to expand archive {name}: {reason}")]
    Archive { name: String, reason: String },

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(String),

    /// The scene collaborator rejected a registration or attachment.
    #[error("scene error: {0}")]
    Scene(String),

    /// Restoring a project-state bundle failed.
    #[error("state restoration failed: {0}")]
    Restore(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// Shorthand for a decode failure with a formatted message.
    pub fn decode(msg: impl Into<String>) -> Self {
        IngestError::DecodeFailure(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_failure_is_generic() {
        let err = IngestError::FetchFailure;
        assert_eq!(err.to_string(), "Failed to download file");
    }

    #[test]
    fn test_duplicate_bundle_display() {
        let err = IngestError::DuplicateStateBundle;
        assert!(err.to_string().contains("multiple state files"));
    }

    #[test]
    fn test_no_reader_display() {
        let err = IngestError::NoReader {
            extension: "xyz".to_string(),
        };
        assert_eq!(err.to_string(), "No reader registered for extension 'xyz'");
    }

    #[test]
    fn test_io_error_from() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: IngestError = io.into();
        assert!(matches!(err, IngestError::Io(_)));
    }
}
