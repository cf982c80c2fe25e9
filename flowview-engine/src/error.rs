// Engine Errors
// Failures that can occur while ingesting configuration, snapshots and events

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised at the ingestion boundary of the engine.
///
/// The graph operations themselves never fail; only loading and parsing
/// external input can.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid step snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Result alias used by ingestion helpers
pub type EngineResult<T> = Result<T, EngineError>;
