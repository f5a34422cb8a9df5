//! Error types for spoc-db-lexicon

use thiserror::Error;

/// Result type alias using our error
pub type Result<T> = std::result::Result<T, LexiconError>;

/// Lexicon error type
#[derive(Error, Debug)]
pub enum LexiconError {
    /// Failure from the statement layer
    #[error(transparent)]
    Core(#[from] spoc_db_core::Error),

    /// A term source could not resolve a chunk of identifiers
    #[error("Resolve error: {0}")]
    Resolve(String),

    /// Identifiers could not be assigned to a chunk of terms
    #[error("Write error: {0}")]
    Write(String),

    /// Several chunks failed
    #[error("{} errors: {}", .0.len(), join(.0))]
    Aggregate(Vec<LexiconError>),

    /// Unreadable cache configuration
    #[error("Config error: {0}")]
    Config(String),
}

fn join(errors: &[LexiconError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl LexiconError {
    /// Create a resolve error
    pub fn resolve(msg: impl Into<String>) -> Self {
        LexiconError::Resolve(msg.into())
    }

    /// Create a write error
    pub fn write(msg: impl Into<String>) -> Self {
        LexiconError::Write(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        LexiconError::Config(msg.into())
    }

    /// One error stays as is; several become an `Aggregate`
    pub fn aggregate(mut errors: Vec<LexiconError>) -> Self {
        if errors.len() == 1 {
            if let Some(e) = errors.pop() {
                return e;
            }
        }
        LexiconError::Aggregate(errors)
    }
}

impl From<toml::de::Error> for LexiconError {
    fn from(e: toml::de::Error) -> Self {
        LexiconError::Config(e.to_string())
    }
}

impl From<std::io::Error> for LexiconError {
    fn from(e: std::io::Error) -> Self {
        LexiconError::Config(e.to_string())
    }
}
