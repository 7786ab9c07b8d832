//! Error types for the chirp client library.
//!
//! This module provides a unified error type with explicit variants for
//! transport, authentication, protocol, storage, and input validation errors.

use std::fmt;
use thiserror::Error;

/// The unified error type for chirp operations.
///
/// This error type covers all possible failure modes in the library,
/// with explicit variants to allow callers to handle specific cases.
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (DNS, TLS, connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Authentication errors (missing session, failed token refresh).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Protocol errors (non-2xx API responses).
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Session persistence errors.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Input validation errors (invalid server URL).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connection {
                message: err.to_string(),
            }
        } else {
            TransportError::Http {
                message: err.to_string(),
            }
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(TransportError::from(err))
    }
}

/// Authentication-related errors.
///
/// These are `Clone` because the refresh coordinator broadcasts a single
/// outcome to every caller waiting on an in-flight refresh.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// An operation required an authenticated session but none is present.
    #[error("not authenticated")]
    NotAuthenticated,

    /// A 401 was received but no refresh token is available to recover with.
    #[error("no refresh token available")]
    RefreshTokenMissing,

    /// The refresh endpoint rejected the refresh token or was unreachable.
    /// The session has been cleared by the time this error is observed.
    #[error("token refresh failed: {}", detail.as_deref().unwrap_or("request could not be completed"))]
    RefreshFailed {
        /// HTTP status from the refresh endpoint, if a response was received.
        status: Option<u16>,
        /// Human-readable `detail` from the server's error body.
        detail: Option<String>,
    },
}

/// Protocol-level errors from API responses.
#[derive(Debug)]
pub struct ProtocolError {
    /// HTTP status code.
    pub status: u16,
    /// Error message from the server's `{detail}` body, if present.
    pub detail: Option<String>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref detail) = self.detail {
            write!(f, ": {}", detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {}

impl ProtocolError {
    /// Create a new protocol error.
    pub fn new(status: u16, detail: Option<String>) -> Self {
        Self { status, detail }
    }

    /// Check if this is an authorization failure.
    pub fn is_auth_error(&self) -> bool {
        self.status == 401
    }
}

/// Session persistence errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem error while reading or writing the session record.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted session record could not be encoded or decoded.
    #[error("invalid session record: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid server URL format.
    #[error("invalid server URL '{value}': {reason}")]
    ServerUrl { value: String, reason: String },
}
