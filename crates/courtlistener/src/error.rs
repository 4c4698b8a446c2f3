use thiserror::Error;

use crate::retry::{Classify, FailureClass};

#[derive(Debug, Error)]
pub enum LookupError {
    /// Missing API token or unusable client settings
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CourtListener returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Cache write failed: {0}")]
    Cache(#[from] std::io::Error),
}

impl Classify for LookupError {
    fn failure_class(&self) -> FailureClass {
        match self {
            LookupError::Status { status: 429, .. } => FailureClass::RateLimited,
            // The citation-lookup endpoint returns spurious 400s that succeed on retry.
            LookupError::Status { status: 400, .. } => FailureClass::Transient,
            LookupError::Status { status, .. } if *status >= 500 => FailureClass::Transient,
            LookupError::Status { .. } => FailureClass::Permanent,
            LookupError::Transport(e) if e.is_timeout() || e.is_connect() => {
                FailureClass::Transient
            }
            _ => FailureClass::Permanent,
        }
    }
}
