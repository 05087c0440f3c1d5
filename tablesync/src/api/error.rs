//! Error returned by gateway calls

use serde::{Deserialize, Serialize};

/// Error from a content-store API call
///
/// `status` carries the HTTP status when the server answered. Transport
/// failures (connection reset, timeout) have no status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub status: Option<u16>,
    pub message: String,
}

impl ApiError {
    /// Error with an HTTP status from the server
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Error raised before any response arrived
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// Endpoint does not exist on this backend (404-class)
    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }

    /// Request body rejected for size (413-class)
    pub fn is_payload_too_large(&self) -> bool {
        self.status == Some(413)
    }

    pub fn is_transport(&self) -> bool {
        self.status.is_none()
    }

    /// Whether repeating the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self.status {
            None => true,
            Some(429) => true,
            Some(code) => (500..600).contains(&code),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(code) => write!(f, "HTTP {}: {}", code, self.message),
            None => write!(f, "transport error: {}", self.message),
        }
    }
}

impl std::error::Error for ApiError {}
