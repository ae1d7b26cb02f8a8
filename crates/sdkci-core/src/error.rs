//! Unified error types for sdkci

use thiserror::Error;

/// Unified error type for all sdkci operations
#[derive(Error, Debug)]
pub enum SdkciError {
    // Input errors, raised before any remote call is made
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // Build service errors
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Build service error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(String),

    // Git errors
    #[error("Git command failed: {0}")]
    Git(String),

    // Comment errors
    #[error("Comment error: {0}")]
    Comment(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl SdkciError {
    /// Whether the remote side reported that the requested entity does not exist.
    ///
    /// Only this class of error is recovered locally (by falling back or
    /// creating the entity); everything else propagates.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type alias using SdkciError
pub type Result<T> = std::result::Result<T, SdkciError>;
