use std::fmt;
use thiserror::Error;

/// The error type for reqstore operations
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<anyhow::Error>,
}

/// The kind of error that occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Username is malformed, for example carries an account prefix
    InvalidCredentialFormat,

    /// Account discovery returned no usable storage account
    AccountResolutionFailed,

    /// Auth exchange failed, or a request was still unauthorized after retry
    AuthenticationFailed,

    /// The target resource does not exist
    NotFound,

    /// Response claimed to be JSON but could not be decoded
    ResponseDecodingFailed,

    /// Catalog filter argument is not a sequence
    InvalidFilterArgument,

    /// Configuration error (missing fields, invalid values)
    ConfigInvalid,

    /// Request cannot be built (invalid header, uri, etc.)
    RequestInvalid,

    /// Unexpected errors (network, I/O, service errors, etc.)
    Unexpected,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message without the kind prefix
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Check if this is an authentication related error
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::InvalidCredentialFormat
                | ErrorKind::AccountResolutionFailed
                | ErrorKind::AuthenticationFailed
        )
    }

    /// Check if this error means the resource is absent
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

// Convenience constructors
impl Error {
    /// Create an invalid credential format error
    pub fn invalid_credential_format(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidCredentialFormat, message)
    }

    /// Create an account resolution failed error
    pub fn account_resolution_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AccountResolutionFailed, message)
    }

    /// Create an authentication failed error
    pub fn authentication_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthenticationFailed, message)
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a response decoding failed error
    pub fn response_decoding_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResponseDecodingFailed, message)
    }

    /// Create an invalid filter argument error
    pub fn invalid_filter_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidFilterArgument, message)
    }

    /// Create a config invalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create a request invalid error
    pub fn request_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestInvalid, message)
    }

    /// Create an unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidCredentialFormat => write!(f, "invalid credential format"),
            ErrorKind::AccountResolutionFailed => write!(f, "account resolution failed"),
            ErrorKind::AuthenticationFailed => write!(f, "authentication failed"),
            ErrorKind::NotFound => write!(f, "not found"),
            ErrorKind::ResponseDecodingFailed => write!(f, "response decoding failed"),
            ErrorKind::InvalidFilterArgument => write!(f, "invalid filter argument"),
            ErrorKind::ConfigInvalid => write!(f, "invalid configuration"),
            ErrorKind::RequestInvalid => write!(f, "invalid request"),
            ErrorKind::Unexpected => write!(f, "unexpected error"),
        }
    }
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

// Common From implementations
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(err)
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::ToStrError> for Error {
    fn from(err: http::header::ToStrError) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(err: http::uri::InvalidUri) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::response_decoding_failed(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::not_found("object photos/cat.png");
        assert_eq!(err.to_string(), "not found: object photos/cat.png");
        assert!(err.is_not_found());
        assert!(!err.is_auth_error());
    }

    #[test]
    fn test_error_source() {
        let err = Error::unexpected("send failed")
            .with_source(anyhow::anyhow!("connection reset"));
        let source = std::error::Error::source(&err).expect("source must be kept");
        assert_eq!(source.to_string(), "connection reset");
    }

    #[test]
    fn test_serde_json_error_is_decoding_failure() {
        let err: Error = serde_json::from_slice::<serde_json::Value>(b"{")
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::ResponseDecodingFailed);
    }
}
