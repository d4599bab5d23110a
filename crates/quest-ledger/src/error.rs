//! Error types for ledger access
//!
//! Transport errors keep the underlying message verbatim so it can be
//! shown to the user unchanged.

use std::path::PathBuf;

/// Failures reported by a [`LedgerTransport`](crate::LedgerTransport)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The signer declined the request
    #[error("signature rejected: {0}")]
    Rejected(String),

    /// The transaction executed and reverted
    #[error("transaction reverted: {0}")]
    Reverted(String),

    /// RPC or network failure
    #[error("rpc error: {0}")]
    Rpc(String),

    /// The transport gave up waiting
    #[error("timed out: {0}")]
    Timeout(String),
}

impl TransportError {
    /// Underlying message without the category prefix
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Rejected(m) | Self::Reverted(m) | Self::Rpc(m) | Self::Timeout(m) => m,
        }
    }

    /// Whether the user declined to sign
    #[inline]
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// A known event whose payload does not match its schema
#[derive(Debug, thiserror::Error)]
#[error("malformed {event} event: {source}")]
pub struct DecodeError {
    pub event: String,
    #[source]
    pub source: serde_json::Error,
}

/// Errors loading or saving simulated ledger state
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// IO error on the state file
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// State file is not valid JSON
    #[error("invalid ledger state in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StateError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
