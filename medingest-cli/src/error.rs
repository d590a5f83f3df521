//! CLI error type.

use std::path::PathBuf;

use medingest::config::ConfigError;
use medingest::IngestError;
use thiserror::Error;

/// Errors reported by CLI commands. Any of them exits with status 1.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error("Failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("Failed to set up logging: {0}")]
    Logging(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("{0} file(s) failed to load")]
    EntriesFailed(usize),

    #[error("Commit failed: {0}")]
    CommitFailed(String),
}
