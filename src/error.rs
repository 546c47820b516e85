//! Error types for loading and running a matching study

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StudyError {
    #[error("Missing input {}: {source}", path.display())]
    MissingInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed input {}: {source}", path.display())]
    MalformedInput {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing field configuration: {0}")]
    MissingField(String),

    #[error("Track store {store} is misaligned: {tracks} tracks, {labels} labels")]
    LengthMismatch {
        store: String,
        tracks: usize,
        labels: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StudyError>;
