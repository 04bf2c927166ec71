//! Pipedrive API error types

use pipedrive_shared_config::ConfigError;
use reqwest::StatusCode;
use thiserror::Error;

/// Pipedrive API client errors
#[derive(Error, Debug)]
pub enum PipedriveError {
    /// Client configuration is missing or invalid
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipedrive answered with a non-success status
    #[error("Pipedrive API error {status}: {message}")]
    Api { status: StatusCode, message: String },

    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("Failed to parse Pipedrive response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Successful response without the expected `data` payload
    #[error("Pipedrive response for {0} had no data")]
    MissingData(String),

    /// Request timeout
    #[error("Request to Pipedrive timed out")]
    Timeout,
}

impl PipedriveError {
    /// Check if Pipedrive rejected the request
    ///
    /// Validation failures and server errors both land here; callers that
    /// need to tell them apart can inspect [`PipedriveError::status`].
    pub fn is_request_error(&self) -> bool {
        matches!(self, PipedriveError::Api { .. })
    }

    /// Check if the client could not be configured
    pub fn is_config_error(&self) -> bool {
        matches!(self, PipedriveError::Config(_))
    }

    /// HTTP status of a rejected request
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            PipedriveError::Api { status, .. } => Some(*status),
            PipedriveError::Http(e) => e.status(),
            _ => None,
        }
    }
}

/// Result type for Pipedrive operations
pub type PipedriveResult<T> = Result<T, PipedriveError>;
