//! Error types for spoc-db-core

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Missing or out-of-domain input (null identifier, bad bit count, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Key order index or name outside the registered set
    #[error("Invalid key order: {0}")]
    InvalidKeyOrder(String),

    /// Operation not legal in the current state (double pushback, closed iterator, ...)
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// Background work was cancelled
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Storage collaborator failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Create an invalid key order error
    pub fn invalid_key_order(msg: impl Into<String>) -> Self {
        Error::InvalidKeyOrder(msg.into())
    }

    /// Create an illegal state error
    pub fn illegal_state(msg: impl Into<String>) -> Self {
        Error::IllegalState(msg.into())
    }

    /// Create a cancelled error
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Error::Cancelled(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage(msg.into())
    }

    /// True for `Cancelled`
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled(_))
    }
}
