//! Backend error types.
//!
//! This module defines the errors surfaced by graph and search backend calls.

use thiserror::Error;

/// Errors that can occur while talking to a backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// A required connection input is missing or unreadable. Never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The retry budget is spent, or a reconnect is already in flight.
    #[error("{backend} unavailable after {attempts} attempts: {last_error}")]
    Unavailable {
        backend: &'static str,
        attempts: u32,
        last_error: String,
    },

    /// The handshake with the backend failed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A request failed in a way that may succeed on a fresh connection.
    #[error("Request error: {0}")]
    Request(String),

    /// The backend refused the request.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The backend answered with something we could not map.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl BackendError {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a request error.
    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }

    /// Create a rejected request error.
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Whether a fresh connection attempt might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Connection(_) | BackendError::Request(_) => true,
            BackendError::Configuration(_)
            | BackendError::Unavailable { .. }
            | BackendError::Rejected(_)
            | BackendError::Decode(_) => false,
        }
    }

    /// Whether the backend could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, BackendError::Unavailable { .. })
    }
}
