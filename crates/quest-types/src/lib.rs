//! Quest Types
//!
//! Shared data model for the progress & reward reconciliation layer.
//!
//! # Core Concepts
//!
//! - [`Address`]: wallet identity; every cache key and ledger call is scoped by it
//! - [`Task`] / [`Goal`]: locally owned records carrying the `ledger_id` used on-chain
//! - [`UserStats`]: the reconciled progress view
//! - [`LocalSnapshot`] / [`LedgerSnapshot`]: the two sources it is derived from
//! - [`Mission`]: ledger-tracked progress toward a target
//! - [`CompletionResult`]: uniform outcome of reward-issuing actions

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod address;
mod completion;
mod mission;
mod records;
mod stats;

pub use address::{Address, AddressError, TxHash};
pub use completion::{CompletionResult, RewardSource};
pub use mission::{Mission, MissionCounter, MissionDefinition, ProgressSource};
pub use records::{Goal, NewGoal, NewTask, Priority, RecordId, Task, UnknownPriority};
pub use stats::{LedgerSnapshot, LocalSnapshot, UserStats};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
