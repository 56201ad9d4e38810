//! Error types for the service client.

use thiserror::Error;

/// Errors produced while talking to the processing service.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("authentication error: {0}")]
    Auth(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("service returned HTTP {status} for {url}: {body}")]
    Status { status: u16, url: String, body: String },

    #[error("invalid service response: {0}")]
    Decode(String),

    #[error("core error: {0}")]
    Core(#[from] sarwatch_core::Error),
}

impl CloudError {
    /// Whether the error comes from missing or rejected credentials
    pub fn is_credential_error(&self) -> bool {
        match self {
            Self::Auth(_) | Self::Configuration(_) => true,
            Self::Status { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }
}

/// Result alias for service operations.
pub type Result<T> = std::result::Result<T, CloudError>;
