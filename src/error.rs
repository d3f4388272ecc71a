use std::fmt;

use thiserror::Error;

use crate::games::NormalizeError;

/// Network-level failures that are expected to clear up on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
    Timeout,
    Connection,
    TooManyRedirects,
}

impl fmt::Display for TransientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransientKind::Timeout => "read timeout",
            TransientKind::Connection => "connection error",
            TransientKind::TooManyRedirects => "too many redirects",
        };
        f.write_str(s)
    }
}

/// Everything that can go wrong while pulling data from an upstream feed.
///
/// Only [`FetchError::Transient`] is retried; every other variant is a
/// fatal error that must reach the caller on the first occurrence.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{kind}: {message}")]
    Transient { kind: TransientKind, message: String },

    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed upstream response: {0}")]
    Malformed(String),

    #[error("failed to decode upstream response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("request failed: {0}")]
    Request(String),
}

impl FetchError {
    pub fn transient(kind: TransientKind, message: impl Into<String>) -> Self {
        FetchError::Transient {
            kind,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        FetchError::Malformed(message.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient { .. })
    }

    pub fn transient_kind(&self) -> Option<TransientKind> {
        match self {
            FetchError::Transient { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            FetchError::transient(TransientKind::Timeout, message)
        } else if err.is_connect() {
            FetchError::transient(TransientKind::Connection, message)
        } else if err.is_redirect() {
            FetchError::transient(TransientKind::TooManyRedirects, message)
        } else if let Some(status) = err.status() {
            FetchError::Status {
                status: status.as_u16(),
                body: message,
            }
        } else if err.is_decode() {
            FetchError::Malformed(message)
        } else {
            FetchError::Request(message)
        }
    }
}
