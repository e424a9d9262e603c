//! API Client Errors
//!
//! Transport failures, non-success statuses and malformed bodies all
//! surface as one [`RequestFailed`] so callers handle a single type.

use thiserror::Error;

/// A backend call that did not produce a usable response
#[derive(Error, Debug)]
#[error("Request to {endpoint} failed: {cause}")]
pub struct RequestFailed {
    /// Endpoint path, e.g. `/api/dashboard/metrics`
    pub endpoint: String,
    /// HTTP status if a response was received
    pub status: Option<u16>,
    pub cause: FailureCause,
}

/// What went wrong underneath a [`RequestFailed`]
#[derive(Error, Debug)]
pub enum FailureCause {
    /// Connection refused, DNS failure, timeout, reset
    #[error("transport error: {0}")]
    Transport(String),

    /// Response arrived with a non-2xx status
    #[error("HTTP error! status: {0}")]
    Status(u16),

    /// Body was not the JSON we expected
    #[error("malformed response body: {0}")]
    Decode(String),
}

impl RequestFailed {
    pub fn transport(endpoint: &str, err: reqwest::Error) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            status: err.status().map(|s| s.as_u16()),
            cause: FailureCause::Transport(err.to_string()),
        }
    }

    pub fn status(endpoint: &str, status: u16) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            status: Some(status),
            cause: FailureCause::Status(status),
        }
    }

    pub fn decode(endpoint: &str, status: u16, err: impl std::fmt::Display) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            status: Some(status),
            cause: FailureCause::Decode(err.to_string()),
        }
    }

    /// True when no HTTP response was received at all
    pub fn is_transport(&self) -> bool {
        matches!(self.cause, FailureCause::Transport(_))
    }
}

/// Result type for backend calls
pub type ApiResult<T> = Result<T, RequestFailed>;
