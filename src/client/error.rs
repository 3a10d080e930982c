//! API client error types

use thiserror::Error;

/// Message shown when a send outlives its deadline
pub const TIMEOUT_MESSAGE: &str = "Request timed out. Please try again.";

/// API error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Network, message)
    }

    pub fn timeout() -> Self {
        Self::new(ApiErrorKind::Timeout, TIMEOUT_MESSAGE)
    }

    pub fn cancelled() -> Self {
        Self::new(ApiErrorKind::Cancelled, "Request cancelled")
    }

    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Status(code), message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Decode, message)
    }

    /// Classify a transport error from reqwest
    pub fn from_transport(context: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout()
        } else if err.is_decode() {
            Self::decode(format!("{context}: invalid response body: {err}"))
        } else if err.is_connect() {
            Self::network(format!("{context}: connection failed: {err}"))
        } else {
            Self::network(format!("{context}: {err}"))
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ApiErrorKind::Timeout
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Backend unreachable or connection dropped
    Network,
    /// Deadline elapsed before the backend answered
    Timeout,
    /// Caller cancelled the operation
    Cancelled,
    /// Non-success HTTP status where the operation treats it as a failure
    Status(u16),
    /// Body was not the expected JSON
    Decode,
}
