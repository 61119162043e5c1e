//! Error type shared by the stores, tools and agent

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlacementError>;

pub type Error = PlacementError;

/// Process exit codes used by the CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    /// A data artifact (facts or semantic index) is missing
    pub const NOT_FOUND: i32 = 2;
    pub const INVALID_INPUT: i32 = 3;
}

#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("Data file not found: {0}")]
    DataNotFound(String),

    /// The artifact exists but does not have the expected layout
    #[error("Cannot parse {path}: {reason}")]
    MalformedData { path: String, reason: String },

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Semantic search failed: {0}")]
    Search(String),

    /// Non-2xx reply from the chat or embedding service
    #[error("{service} service returned HTTP {status}: {body}")]
    Service {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cannot reach service: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config file error: {0}")]
    ConfigFile(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PlacementError {
    pub(crate) fn malformed(path: &std::path::Path, reason: impl ToString) -> Self {
        Self::MalformedData {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::DataNotFound(_) => exit_codes::NOT_FOUND,
            Self::InvalidInput(_) | Self::ConfigFile(_) => exit_codes::INVALID_INPUT,
            _ => exit_codes::GENERAL_ERROR,
        }
    }
}
