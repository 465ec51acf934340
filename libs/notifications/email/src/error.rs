//! Error types for email delivery.

use thiserror::Error;

/// Result type for email operations.
pub type EmailResult<T> = Result<T, EmailError>;

/// Errors that can occur while building or sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// Provider configuration is missing or invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// The message itself is malformed (bad address, no body)
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The provider rejected or failed the send. Displays as the raw
    /// provider message so failure classification can match on it.
    #[error("{0}")]
    Provider(String),
}

impl From<serde_json::Error> for EmailError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidMessage(err.to_string())
    }
}
