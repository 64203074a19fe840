//! Error types for directory operations.
//!
//! The taxonomy separates failures of the connection lifecycle (connect, bind) from failures of
//! individual requests (protocol, search) so callers can decide what is worth retrying.

use thiserror::Error;

/// Main error type for directory operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Transport or TLS establishment failed
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The server rejected the bind credentials
    #[error("Bind rejected for `{dn}`: {message}")]
    Bind {
        /// DN used for the bind (empty for anonymous binds)
        dn: String,
        /// Server diagnostic message
        message: String,
    },

    /// Malformed request or unsupported operation
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server rejected or failed a search
    #[error("Search under `{base_dn}` failed (result code {code}): {message}")]
    Search {
        /// Base DN of the failed search
        base_dn: String,
        /// LDAP result code returned by the server
        code: u32,
        /// Server diagnostic message
        message: String,
    },

    /// Operation timed out
    #[error("Timeout waiting for directory: {0}")]
    Timeout(String),

    /// Entry not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request rejected before reaching the directory
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Specialized result type for directory operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Connect(_) => "CONNECT_ERROR",
            Self::Bind { .. } => "BIND_ERROR",
            Self::Protocol(_) => "PROTOCOL_ERROR",
            Self::Search { .. } => "SEARCH_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::ValidationError(_) => "VALIDATION_ERROR",
        }
    }

    /// Returns true if this error should be logged as a serious error.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(
            self,
            Self::Connect(_) | Self::Bind { .. } | Self::Protocol(_) | Self::ConfigError(_)
        )
    }

    /// Returns true when repeating the same operation later may succeed.
    ///
    /// Bind and protocol failures are never retryable with the same inputs.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Timeout(_))
    }

    /// Returns true if the error invalidates the underlying connection.
    #[must_use]
    pub const fn is_connection_failure(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Timeout(_))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::ConfigError(format!("invalid directory URL: {err}"))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(err.to_string())
    }
}
