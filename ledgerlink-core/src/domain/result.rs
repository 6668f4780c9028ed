//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    Duplicate(String),

    #[error("OAuth exchange failed: {0}")]
    OAuthExchange(String),

    #[error("OAuth refresh failed: {0}")]
    OAuthRefresh(String),

    #[error("Provider API error: {message}")]
    ProviderApi {
        /// HTTP status from the provider, when the failure was an HTTP response
        status: Option<u16>,
        message: String,
    },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Sync incomplete: {0}")]
    SyncIncomplete(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a provider API error with an HTTP status
    pub fn provider_status(status: u16, msg: impl Into<String>) -> Self {
        Self::ProviderApi {
            status: Some(status),
            message: msg.into(),
        }
    }

    /// Create a provider API error without an HTTP status (transport failure)
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::ProviderApi {
            status: None,
            message: msg.into(),
        }
    }

    /// Whether this error is a provider auth rejection.
    ///
    /// Drives the refresh-then-retry-once policy: callers refresh the stored
    /// credentials exactly once and retry, nothing else is retried.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Error::ProviderApi {
                status: Some(401) | Some(403),
                ..
            }
        )
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
