//! Error types for the harvester library.

use std::path::PathBuf;

/// All errors that can surface out of the harvesting pipeline.
///
/// Per-field and per-page failures never reach this type: they are absorbed
/// at the extractor, collector, parser and worker boundaries.
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("No browser session could be opened for the worker pool")]
    NoSessions,

    #[error("Worker task failed: {0}")]
    Join(String),

    #[error("Failed to write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<anyhow::Error> for HarvestError {
    fn from(e: anyhow::Error) -> Self {
        HarvestError::Browser(format!("{e:#}"))
    }
}

pub type HarvestResult<T> = Result<T, HarvestError>;
