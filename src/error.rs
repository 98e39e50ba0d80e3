//! Error types for the display engine
//!
//! Every error here is caught at its call site and folded into screen-local
//! state. Nothing in this module is allowed to stop a rotation loop.

use thiserror::Error;

/// Failure of a single fetch or mutating call against the content server
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Transport failure or non-2xx HTTP status
    #[error("{reason}")]
    Network {
        reason: String,
        status: Option<u16>,
    },

    /// Payload did not have the expected shape
    #[error("Malformed payload: {0}")]
    Payload(String),

    /// Payload was well-formed but carried no items
    #[error("{0}")]
    EmptyResult(String),

    /// Server rejected a mutating action (including `success: false`)
    #[error("{0}")]
    Action(String),
}

impl FetchError {
    /// Error for a non-2xx status code
    pub fn status(status: u16) -> Self {
        FetchError::Network {
            reason: format!("HTTP error! status: {}", status),
            status: Some(status),
        }
    }

    /// HTTP status attached to the failure, if any
    pub fn http_status(&self) -> Option<u16> {
        match self {
            FetchError::Network { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return FetchError::Payload(e.to_string());
        }
        FetchError::Network {
            reason: e.to_string(),
            status: e.status().map(|s| s.as_u16()),
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Payload(e.to_string())
    }
}

/// Failure of a user-triggered mutation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Please select valid image files.")]
    NoImageFiles,

    #[error("An upload is already in progress")]
    UploadInProgress,

    #[error("Screen is no longer mounted")]
    Unmounted,

    #[error("No item is currently displayed")]
    NothingDisplayed,

    #[error("Could not read {file}: {reason}")]
    Conversion { file: String, reason: String },

    #[error(transparent)]
    Remote(#[from] FetchError),
}

/// Invalid configuration value
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}
