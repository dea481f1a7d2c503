//! Common error types for tubeup.

use std::fmt;

use thiserror::Error;

/// Top-level error type for tubeup operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A required local input is missing or unusable.
    #[error("{0}")]
    Precondition(String),

    /// OAuth2 exchange or refresh failed.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The request never produced an HTTP response.
    #[error("Network error: {0}")]
    Network(String),

    /// The platform answered with a non-success status.
    #[error("<HttpError {status} ({reason}): {message}>")]
    Api {
        status: u16,
        reason: String,
        message: String,
    },

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation called in a state that does not allow it.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Coarse classification used when reporting a failure to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing client secrets, video file or credential file.
    Precondition,
    /// Credential exchange/refresh or connection failure.
    Transport,
    /// Error response from the platform API.
    Platform,
    /// Anything else.
    Unknown,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Precondition => "precondition",
            ErrorCategory::Transport => "transport",
            ErrorCategory::Platform => "platform",
            ErrorCategory::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Build a platform error from an HTTP status and a message.
    pub fn api(status: u16, reason: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Api {
            status,
            reason: reason.into(),
            message: message.into(),
        }
    }

    /// Classify this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Precondition(_) => ErrorCategory::Precondition,
            Error::Authentication(_) | Error::Network(_) => ErrorCategory::Transport,
            Error::Api { .. } => ErrorCategory::Platform,
            Error::Io(_)
            | Error::Serialization(_)
            | Error::InvalidInput(_)
            | Error::InvalidState(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether the error came from the platform API.
    pub fn is_platform(&self) -> bool {
        self.category() == ErrorCategory::Platform
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
