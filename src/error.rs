use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunCostError {
    #[error("API request failed with status {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("API request failed with status {status} after {retries} retries")]
    ApiErrorAfterRetries { status: u16, retries: u32 },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid time window: {0}")]
    Window(String),

    #[error("Invalid repository '{0}': expected 'owner/name'")]
    Repository(String),

    #[error("Malformed CSV in {}: {reason}", path.display())]
    Csv { path: PathBuf, reason: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RunCostError>;
