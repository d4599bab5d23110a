//! Contract calls and transaction receipts

use crate::events::RawLog;
use quest_types::{Address, Priority, TxHash};
use serde::{Deserialize, Serialize};

/// A state-changing call against the rewards contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum ContractCall {
    /// `completeTask(id, priority)`
    CompleteTask { task_id: u64, priority: Priority },
    /// `rewardFarcasterShare()`
    RewardFarcasterShare,
    /// `completeWeeklyGoal(id)`
    CompleteWeeklyGoal { goal_id: u64 },
    /// `transfer(to, amount)`
    Transfer { to: Address, amount: u128 },
}

impl ContractCall {
    /// Contract method name
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::CompleteTask { .. } => "completeTask",
            Self::RewardFarcasterShare => "rewardFarcasterShare",
            Self::CompleteWeeklyGoal { .. } => "completeWeeklyGoal",
            Self::Transfer { .. } => "transfer",
        }
    }
}

/// Execution status of an included transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReceiptStatus {
    Success,
    Reverted { reason: String },
}

/// Receipt of an included transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub status: ReceiptStatus,
    #[serde(default)]
    pub logs: Vec<RawLog>,
}

impl Receipt {
    /// Whether the transaction succeeded
    #[inline]
    #[must_use]
    pub fn succeeded(&self) -> bool {
        matches!(self.status, ReceiptStatus::Success)
    }
}
