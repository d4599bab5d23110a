//! Progress counters and the two snapshots they are reconciled from

use serde::{Deserialize, Serialize};

/// The progress view rendered to the user
///
/// Never persisted as a source of truth: it is recomputed from a
/// [`LocalSnapshot`] and a [`LedgerSnapshot`] on every reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub tasks_completed: u64,
    pub streak: u64,
    /// Spendable token balance, always ledger-sourced
    pub balance: u128,
    pub weekly_goals: u64,
}

impl UserStats {
    /// Raise each counter to at least the value in `floor`
    ///
    /// `balance` is left untouched.
    #[must_use]
    pub fn at_least(self, floor: &Self) -> Self {
        Self {
            tasks_completed: self.tasks_completed.max(floor.tasks_completed),
            streak: self.streak.max(floor.streak),
            balance: self.balance,
            weekly_goals: self.weekly_goals.max(floor.weekly_goals),
        }
    }
}

/// Counters derived from the local progress store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalSnapshot {
    pub tasks_completed: u64,
    pub streak: u64,
    pub weekly_goals: u64,
}

impl LocalSnapshot {
    /// Local-only view, used when the ledger could not be read
    #[inline]
    #[must_use]
    pub fn to_stats(self) -> UserStats {
        UserStats {
            tasks_completed: self.tasks_completed,
            streak: self.streak,
            balance: 0,
            weekly_goals: self.weekly_goals,
        }
    }
}

/// What the ledger reported in one refresh
///
/// `None` marks a read that failed; it never means zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerSnapshot {
    /// Result of `getUserStats`
    pub stats: Option<UserStats>,
    /// Result of `balanceOf`
    pub balance: Option<u128>,
}

impl LedgerSnapshot {
    /// Snapshot with both reads failed
    pub const UNAVAILABLE: Self = Self {
        stats: None,
        balance: None,
    };

    /// Spendable balance, preferring `balanceOf` over the stats tuple
    #[inline]
    #[must_use]
    pub fn balance(&self) -> u128 {
        self.balance
            .or_else(|| self.stats.map(|s| s.balance))
            .unwrap_or(0)
    }
}
