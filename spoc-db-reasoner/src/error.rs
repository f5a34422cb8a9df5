//! Error types for spoc-db-reasoner

use thiserror::Error;

/// Result type alias using our error
pub type Result<T> = std::result::Result<T, ReasonerError>;

/// Reasoner error type
#[derive(Error, Debug)]
pub enum ReasonerError {
    /// Failure from the statement layer (scans, iteration, presence checks)
    #[error(transparent)]
    Core(#[from] spoc_db_core::Error),

    /// Missing or out-of-domain construction input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Unreadable inference configuration
    #[error("Config error: {0}")]
    Config(String),
}

impl ReasonerError {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        ReasonerError::InvalidArgument(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        ReasonerError::Config(msg.into())
    }
}

impl From<toml::de::Error> for ReasonerError {
    fn from(e: toml::de::Error) -> Self {
        ReasonerError::Config(e.to_string())
    }
}
