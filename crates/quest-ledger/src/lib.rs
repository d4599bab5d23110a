//! Quest Ledger
//!
//! Typed access to the remote rewards contract and the mission-progress
//! contract.
//!
//! # Architecture
//!
//! ```text
//! LedgerClient ──► LedgerTransport (submit, wait_for_receipt, reads)
//!      │                 ▲
//!      │                 └── SimulatedLedger (in-process contract model)
//!      ▼
//! Receipt ──► decode_logs ──► extract_reward ──► CompletionResult
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use quest_ledger::{LedgerClient, SimulatedLedger};
//! use quest_types::Priority;
//! use std::sync::Arc;
//!
//! let client = LedgerClient::new(Arc::new(SimulatedLedger::new()));
//! let result = client.complete_task(&identity, 7, Priority::High).await;
//! assert!(result.success);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod call;
pub mod client;
pub mod error;
pub mod events;
pub mod simulated;
pub mod transport;

pub use call::{ContractCall, Receipt, ReceiptStatus};
pub use client::{LedgerClient, RewardAction, DEFAULT_SHARE_REWARD};
pub use error::{DecodeError, StateError, TransportError};
pub use events::{decode_logs, extract_reward, streak_bonus, LedgerEvent, RawLog, RewardEvent, RewardExtraction};
pub use simulated::SimulatedLedger;
pub use transport::LedgerTransport;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
