//! Client error types

use thiserror::Error;

use crate::transport::TransportFault;

/// Errors produced by the App Store Connect client
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Invalid credentials
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// API error from App Store Connect
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure (connection, TLS, DNS, timeout)
    #[error(transparent)]
    Transport(#[from] TransportFault),

    /// Upload failed
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    /// Asset processing ended in a failed state
    #[error("Asset processing failed: {0}")]
    AssetFailed(String),

    /// App not found
    #[error("App not found: {0}")]
    AppNotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Operation timed out
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// JWT error
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ConnectError {
    /// HTTP status carried by this error, if it came from an API response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ConnectError>;
