//! Error types for the Emby client

use std::fmt;

use thiserror::Error;

use crate::query::QueryKind;

/// Classification of a failed upstream query
///
/// Authentication failures are kept apart from transient network errors so
/// callers can tell "the key is wrong" from "the server is down".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub enum FetchErrorKind {
    /// The request did not complete within its timeout
    Timeout,
    /// The server rejected the API key (HTTP 401/403)
    AuthFailed,
    /// Connection refused, DNS failure, TLS failure or a 5xx response
    Unreachable,
    /// The server answered but the body was not the expected JSON shape
    MalformedResponse,
}

impl FetchErrorKind {
    /// Whether this failure is expected to clear on its own
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchErrorKind::Timeout | FetchErrorKind::Unreachable)
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FetchErrorKind::Timeout => "timeout",
            FetchErrorKind::AuthFailed => "authentication failed",
            FetchErrorKind::Unreachable => "unreachable",
            FetchErrorKind::MalformedResponse => "malformed response",
        };
        f.write_str(s)
    }
}

/// A single query failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{query} query failed ({kind}): {message}")]
pub struct FetchError {
    /// What went wrong
    pub kind: FetchErrorKind,
    /// Which query failed
    pub query: QueryKind,
    /// Human-readable detail, not meant for matching
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, query: QueryKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            query,
            message: message.into(),
        }
    }

    pub fn timeout(query: QueryKind, message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Timeout, query, message)
    }

    pub fn auth_failed(query: QueryKind) -> Self {
        Self::new(FetchErrorKind::AuthFailed, query, "Authentication failed")
    }

    pub fn unreachable(query: QueryKind, message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Unreachable, query, message)
    }

    pub fn malformed(query: QueryKind, message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::MalformedResponse, query, message)
    }

    /// Classify a transport error from reqwest
    pub(crate) fn from_reqwest(query: QueryKind, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(query, err.to_string())
        } else if err.is_decode() {
            Self::malformed(query, err.to_string())
        } else if let Some(status) = err.status() {
            Self::from_status(query, status)
        } else {
            Self::unreachable(query, err.to_string())
        }
    }

    /// Classify a non-success HTTP status
    pub(crate) fn from_status(query: QueryKind, status: reqwest::StatusCode) -> Self {
        match status.as_u16() {
            401 | 403 => Self::auth_failed(query),
            404 => Self::malformed(query, format!("Endpoint not found: HTTP {}", status)),
            _ if status.is_server_error() => Self::unreachable(query, format!("HTTP {}", status)),
            _ => Self::malformed(query, format!("Unexpected HTTP {}", status)),
        }
    }
}

/// Errors raised while constructing a client
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection settings are invalid
    #[error("Invalid connection config: {0}")]
    InvalidConfig(String),

    /// The base URL could not be built from host and port
    #[error("Invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The underlying HTTP client failed to initialize
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}
