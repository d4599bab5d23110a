//! Error types for Quest Core
//!
//! Completion actions never surface these across the public boundary;
//! they become `CompletionResult::error` strings. They are returned by
//! setup paths (configuration, tracing, CLI wiring) and by the phase
//! tracker.

use crate::phase::RewardPhase;
use quest_ledger::StateError;
use quest_store::StoreError;
use quest_types::AddressError;
use std::path::PathBuf;

/// Main error type
#[derive(Debug, thiserror::Error)]
pub enum QuestError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Local store error
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Simulated ledger state error
    #[error("ledger state error: {0}")]
    LedgerState(#[from] StateError),

    /// Invalid address
    #[error("invalid address: {0}")]
    Address(#[from] AddressError),

    /// Illegal phase transition
    #[error("phase error: {0}")]
    Phase(#[from] PhaseError),

    /// Tracing subscriber could not be installed
    #[error("telemetry error: {0}")]
    Telemetry(String),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading the config file
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid TOML
    #[error("parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Semantically invalid value
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Phase tracker errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhaseError {
    /// Transition not in the allowed table
    #[error("illegal transition {from:?} -> {to:?}")]
    IllegalTransition { from: RewardPhase, to: RewardPhase },

    /// Action id no longer tracked
    #[error("unknown action: {0}")]
    UnknownAction(String),
}

/// Result type alias for core operations
pub type QuestResult<T> = Result<T, QuestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_error_display() {
        let err = PhaseError::IllegalTransition {
            from: RewardPhase::Idle,
            to: RewardPhase::Reconciling,
        };
        assert_eq!(err.to_string(), "illegal transition Idle -> Reconciling");
    }

    #[test]
    fn error_conversions() {
        let err: QuestError = ConfigError::Invalid("missions".to_string()).into();
        assert!(matches!(err, QuestError::Config(_)));
    }
}
