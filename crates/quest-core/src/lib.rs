//! Quest Core - reward orchestration and progress reconciliation
//!
//! Sits between the local progress store and the rewards ledger:
//! - Runs each reward action as a one-shot, two-phase local commit
//! - Reconciles local and ledger counters into one view
//! - Reports every failure as `CompletionResult` data
//!
//! # Architecture
//!
//! ```text
//!                RewardOrchestrator
//!        ┌──────────┼─────────────┬──────────────┐
//!        ▼          ▼             ▼              ▼
//!  WalletSession  ProgressStore  LedgerClient   Notifier
//!                    │             │
//!                    └──► Reconciler ◄──┘──► StatsCache (last view)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use quest_core::prelude::*;
//!
//! let orchestrator = RewardOrchestrator::from_config(&config, transport, backend, session);
//! let task = orchestrator.store().add_task(&identity, NewTask::new("Write docs"))?;
//! let outcome = orchestrator.complete_task(&identity, task.id).await;
//! println!("reward {}", outcome.result.reward);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cache;
pub mod config;
pub mod error;
pub mod notify;
pub mod orchestrator;
pub mod phase;
pub mod reconciler;
pub mod session;
pub mod telemetry;

pub use cache::StatsCache;
pub use config::{CacheConfig, LedgerConfig, LoggingConfig, QuestConfig, StoreConfig};
pub use error::{ConfigError, PhaseError, QuestError, QuestResult};
pub use notify::{NoopNotifier, Notifier, TracingNotifier};
pub use orchestrator::{CompletionOutcome, RewardOrchestrator, SHARE_TITLE};
pub use phase::{allowed_transitions, validate_transition, ActionGuard, ActionId, ActionTracker, RewardPhase};
pub use reconciler::{reconcile, reconcile_mission, Reconciler};
pub use session::{StaticSession, WalletSession};
pub use telemetry::init_tracing;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the reward layer
    pub use crate::{
        CompletionOutcome, Notifier, QuestConfig, RewardOrchestrator, RewardPhase, StaticSession,
        WalletSession,
    };
    pub use quest_types::{Address, CompletionResult, NewGoal, NewTask, Priority, RecordId, UserStats};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
