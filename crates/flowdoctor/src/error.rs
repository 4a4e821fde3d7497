//! CLI error types.

use std::path::PathBuf;

use flowdoctor_core::FetchError;
use flowdoctor_telegram::TelegramError;
use thiserror::Error;

/// Errors returned by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Not an automation ID or URL: {0}")]
    InvalidReference(String),

    #[error("Could not read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid automation JSON in {path}: {source}")]
    ParseFile {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Bot(#[from] TelegramError),

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for CLI commands.
pub type Result<T> = std::result::Result<T, CliError>;
