//! Error handling for the listener.

use std::time::Duration;

use http::StatusCode;
use thiserror::Error;

/// The main result type used throughout the listener.
pub type ListenerResult<T> = Result<T, ListenerError>;

/// Status codes that are retried with backoff when returned on open.
pub(crate) const RETRIABLE_STATUSES: [StatusCode; 3] = [
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Error type for every listener operation.
#[derive(Error, Debug)]
pub enum ListenerError {
    /// HTTP request errors from the bundled opener.
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A custom opener could not produce a stream.
    #[error("Open error: {message}")]
    Open { message: String },

    /// The server answered the open request with a non-success status.
    #[error("Unexpected SSE status: {status}")]
    InvalidStatus { status: StatusCode },

    /// The server answered with something other than `text/event-stream`.
    #[error("Unexpected SSE content type: {content_type:?}")]
    InvalidContentType { content_type: String },

    /// Retriable open failures exceeded the configured budget.
    #[error("Max SSE retries exceeded after {attempts} failed attempts")]
    RetriesExhausted { attempts: u32 },

    /// The body stream failed while being read.
    #[error("SSE stream error: {message}")]
    Stream { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Timeout errors
    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// The session's background task is gone.
    #[error("Session closed: {}", reason.as_deref().unwrap_or("no reason given"))]
    SessionClosed { reason: Option<String> },
}

impl ListenerError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an open error, for use by custom openers.
    pub fn open(message: impl Into<String>) -> Self {
        Self::Open {
            message: message.into(),
        }
    }

    /// Create a body stream error.
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream {
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { duration }
    }

    pub(crate) fn invalid_status(status: StatusCode) -> Self {
        Self::InvalidStatus { status }
    }

    pub(crate) fn invalid_content_type(content_type: impl Into<String>) -> Self {
        Self::InvalidContentType {
            content_type: content_type.into(),
        }
    }

    pub(crate) fn retries_exhausted(attempts: u32) -> Self {
        Self::RetriesExhausted { attempts }
    }

    pub(crate) fn session_closed(reason: Option<String>) -> Self {
        Self::SessionClosed { reason }
    }

    /// Returns `true` if a failed open with this error should be retried.
    ///
    /// Only the server-error statuses 500, 502 and 504 qualify; everything
    /// else, including transport failures and content-type mismatches, ends
    /// the session.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::InvalidStatus { status } => RETRIABLE_STATUSES.contains(status),
            _ => false,
        }
    }
}
