//! Error types for keruu

use http::StatusCode;
use thiserror::Error;

/// Result type alias for keruu operations
pub type Result<T> = std::result::Result<T, KeruuError>;

/// Main error type for keruu
#[derive(Error, Debug)]
pub enum KeruuError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Request declared a character set other than UTF-8/16/32
    #[error("unsupported character set '{0}': only UTF-8, UTF-16 and UTF-32 are accepted")]
    UnsupportedEncoding(String),

    /// Request body is not a valid event batch
    #[error("bad request: {0}")]
    BadRequest(String),

    /// IO error, including serializer misconfiguration detected at write time
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl KeruuError {
    /// Whether the failure was caused by the client's request rather than the gateway
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            KeruuError::UnsupportedEncoding(_) | KeruuError::BadRequest(_)
        )
    }
}

impl From<serde_json::Error> for KeruuError {
    fn from(err: serde_json::Error) -> Self {
        KeruuError::BadRequest(format!("request has invalid JSON syntax: {err}"))
    }
}

impl From<csv::Error> for KeruuError {
    fn from(err: csv::Error) -> Self {
        match err.into_kind() {
            csv::ErrorKind::Io(e) => KeruuError::Io(e),
            other => KeruuError::Serialization(format!("{other:?}")),
        }
    }
}

impl From<&KeruuError> for StatusCode {
    fn from(err: &KeruuError) -> Self {
        match err {
            KeruuError::UnsupportedEncoding(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            KeruuError::BadRequest(_) => StatusCode::BAD_REQUEST,
            KeruuError::Config(_) | KeruuError::Io(_) | KeruuError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
