//! Remote document store error types.

use thiserror::Error;

/// Errors that can occur talking to the document store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Authentication against the login endpoint failed.
    #[error("Login failed: {0}")]
    LoginFailed(String),

    /// The request never produced a usable response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The store answered with a non-success status.
    #[error("Store rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// The response did not have the expected shape.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// A binary download produced no bytes.
    #[error("Empty binary body for '{0}'")]
    EmptyBinary(String),

    /// IO error while writing a downloaded binary.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Transport(err.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
