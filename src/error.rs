// file: src/error.rs
// description: Custom error types and result type aliases
// reference: https://docs.rs/thiserror

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Store request to {index} failed with status {status}: {message}")]
    StoreRequest {
        index: String,
        status: u16,
        message: String,
    },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Classification lookup failed for {key}: {message}")]
    Lookup { key: String, message: String },

    #[error("File operation failed for {path}: {source}")]
    FileOperation {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl PipelineError {
    /// True for failures of the store itself, which abort a run.
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            PipelineError::StoreUnavailable(_) | PipelineError::StoreRequest { .. }
        )
    }
}
