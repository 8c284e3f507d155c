//! Error types shared by the gateway, the state containers and the services.

use reqwest::StatusCode;
use thiserror::Error;

/// Result alias for anything that talks to the backend.
pub type ApiResult<T> = Result<T, ApiError>;

/// Result alias for the local key-value store.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors surfaced by the Remote Data Gateway and everything built on it.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The request never produced a response (offline, DNS, TLS, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http {
        status: StatusCode,
        message: String,
        /// Parsed error body, if the server sent one.
        payload: Option<serde_json::Value>,
    },

    /// The response body could not be decoded into the expected shape.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Rejected locally before any request was made.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The response arrived after the state that requested it moved on.
    #[error("stale response discarded (generation {requested}, now {current})")]
    Stale { requested: u64, current: u64 },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the session is no longer valid and must be torn down.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, ApiError::Stale { .. })
    }

    /// Message suitable for showing to a user.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => "Could not reach the server. Check your connection.".to_string(),
            ApiError::Http { message, .. } => message.clone(),
            ApiError::Validation(e) => e.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Parse(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Parse(e.to_string())
    }
}

/// Client-side checks that fail before a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Invalid file type ({0}). Please upload a PDF, DOC, DOCX, or TXT file.")]
    UnsupportedFileType(String),

    #[error("File too large ({size} bytes). Maximum size is {max} bytes.")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Another {0} is already in progress")]
    Busy(&'static str),
}

/// Errors from the persisted client state.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("corrupt value for key {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Database(e.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_detection() {
        let err = ApiError::Http {
            status: StatusCode::UNAUTHORIZED,
            message: "Unauthorized".to_string(),
            payload: None,
        };
        assert!(err.is_unauthorized());
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));

        let err = ApiError::Network("connection refused".to_string());
        assert!(!err.is_unauthorized());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_validation_message_is_user_facing() {
        let err: ApiError = ValidationError::PasswordMismatch.into();
        assert_eq!(err.user_message(), "Passwords do not match");
    }
}
