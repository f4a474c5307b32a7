//! Client-side error types.
//!
//! This module provides [`ClientError`], the error type for every fallible
//! operation in this crate.

use std::path::PathBuf;

/// Client error variants.
///
/// Construction problems surface as [`ClientError::Config`] and are never
/// retried. Per-exchange failures are split so callers can tell a network
/// problem ([`ClientError::Transport`], [`ClientError::Cancelled`]) apart
/// from a body that could not be understood ([`ClientError::Decode`]).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Missing or malformed endpoint, TLS material, or configuration file.
    #[error("configuration error: {0}")]
    Config(String),

    /// Dial or network failure during an exchange.
    #[error("transport error: {0}")]
    Transport(String),

    /// The governing context was cancelled before the exchange completed.
    #[error("transport error: context cancelled")]
    Cancelled,

    /// The request payload could not be encoded as JSON.
    #[error("encode error: {0}")]
    Encode(String),

    /// The response body could not be read or decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The method/path pair does not form a valid HTTP request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A local file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    /// Create an I/O error for the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ClientError::Io {
            path: path.into(),
            source,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> Option<&str> {
        match self {
            ClientError::Config(msg)
            | ClientError::Transport(msg)
            | ClientError::Encode(msg)
            | ClientError::Decode(msg)
            | ClientError::InvalidRequest(msg) => Some(msg),
            ClientError::Cancelled | ClientError::Io { .. } => None,
        }
    }

    /// Returns whether the exchange was aborted by context cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }

    /// Returns whether this is a transport-kind error.
    ///
    /// Cancellation counts as a transport-kind error; use
    /// [`is_cancelled`](Self::is_cancelled) to single it out.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_) | ClientError::Cancelled)
    }

    /// Returns whether the response body could not be decoded.
    pub fn is_decode(&self) -> bool {
        matches!(self, ClientError::Decode(_))
    }

    /// Returns whether this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, ClientError::Config(_))
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Render an error together with its source chain.
///
/// hyper's errors keep the interesting part (refused connection, missing
/// socket) in the source chain rather than in their `Display` output.
pub(crate) fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
