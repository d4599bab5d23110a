//! In-process rewards contract
//!
//! [`SimulatedLedger`] implements [`LedgerTransport`] against an in-memory
//! model of the rewards and mission-progress contracts. It backs the CLI
//! and the test suites, and exposes fault injection for every failure the
//! reward layer has to survive.

use crate::call::{ContractCall, Receipt, ReceiptStatus};
use crate::error::{StateError, TransportError};
use crate::events::{FarcasterShare, LedgerEvent, StreakBonus, TaskCompleted, WeeklyGoal};
use crate::transport::LedgerTransport;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use quest_types::{Address, LocalSnapshot, MissionDefinition, Priority, TxHash, UserStats};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::time::Duration;

/// Reward for a completed task, by priority
#[must_use]
pub const fn task_reward(priority: Priority) -> u128 {
    match priority {
        Priority::Low => 10,
        Priority::Medium => 25,
        Priority::High => 50,
    }
}

/// Reward for a completed weekly goal
pub const WEEKLY_GOAL_REWARD: u128 = 100;
/// Reward for a social share
pub const SHARE_REWARD: u128 = crate::client::DEFAULT_SHARE_REWARD;
/// Bonus credited every [`STREAK_BONUS_INTERVAL`] streak days
pub const STREAK_BONUS: u128 = 20;
/// Streak length that earns a bonus
pub const STREAK_BONUS_INTERVAL: u64 = 7;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Account {
    balance: u128,
    tasks_completed: u64,
    streak: u64,
    weekly_goals: u64,
    shares: u64,
    last_active_day: Option<NaiveDate>,
    completed_tasks: BTreeSet<u64>,
    completed_goals: BTreeSet<u64>,
    /// Stats served while reads are lagging
    #[serde(skip)]
    lagged: Option<UserStats>,
}

impl Account {
    fn stats(&self) -> UserStats {
        UserStats {
            tasks_completed: self.tasks_completed,
            streak: self.streak,
            balance: self.balance,
            weekly_goals: self.weekly_goals,
        }
    }

    fn counters(&self) -> LocalSnapshot {
        LocalSnapshot {
            tasks_completed: self.tasks_completed,
            streak: self.streak,
            weekly_goals: self.weekly_goals,
        }
    }

    /// Advance the streak for activity on `today`; returns the bonus earned
    fn touch_streak(&mut self, today: NaiveDate) -> Option<u128> {
        let advanced = match self.last_active_day {
            Some(day) if day == today => false,
            Some(day) if day.succ_opt() == Some(today) => {
                self.streak += 1;
                true
            }
            _ => {
                self.streak = 1;
                true
            }
        };
        self.last_active_day = Some(today);

        if advanced && self.streak % STREAK_BONUS_INTERVAL == 0 {
            self.balance = self.balance.saturating_add(STREAK_BONUS);
            Some(STREAK_BONUS)
        } else {
            None
        }
    }
}

/// Persistent part of the simulated chain
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChainState {
    accounts: BTreeMap<Address, Account>,
    missions: BTreeMap<u64, MissionDefinition>,
    nonce: u64,
    /// Fixed "today"; wall clock when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    today: Option<NaiveDate>,
    #[serde(skip)]
    receipts: HashMap<TxHash, Receipt>,
}

impl ChainState {
    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }
}

#[derive(Debug, Default)]
struct Faults {
    reject_next: Option<String>,
    revert_next: Option<String>,
    drop_next_receipt: Option<String>,
    fail_reads: bool,
    omit_events: bool,
    lag_stats: bool,
}

/// In-memory rewards contract
#[derive(Debug, Default)]
pub struct SimulatedLedger {
    state: Mutex<ChainState>,
    faults: Mutex<Faults>,
    latency: Duration,
}

impl SimulatedLedger {
    /// Empty chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With simulated network latency on every call
    #[inline]
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Load persisted state, or start empty if `path` does not exist
    ///
    /// # Errors
    /// Returns [`StateError`] if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StateError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }
        let text = std::fs::read_to_string(path).map_err(|e| StateError::io_error(path, e))?;
        let state: ChainState = serde_json::from_str(&text).map_err(|source| StateError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            state: Mutex::new(state),
            ..Self::default()
        })
    }

    /// Persist accounts, missions and the nonce
    ///
    /// # Errors
    /// Returns [`StateError`] if the file cannot be written
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StateError> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(&*self.state.lock()).map_err(|source| StateError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StateError::io_error(parent, e))?;
        }
        std::fs::write(path, text).map_err(|e| StateError::io_error(path, e))
    }

    /// Fix the chain's notion of today
    pub fn set_today(&self, today: NaiveDate) {
        self.state.lock().today = Some(today);
    }

    /// Mint tokens to `address`
    pub fn credit(&self, address: &Address, amount: u128) {
        let mut state = self.state.lock();
        let account = state.accounts.entry(*address).or_default();
        account.balance = account.balance.saturating_add(amount);
    }

    /// Overwrite an account's counters and balance
    ///
    /// Stands in for activity recorded from another device.
    pub fn seed_stats(&self, address: &Address, stats: UserStats) {
        let mut state = self.state.lock();
        let account = state.accounts.entry(*address).or_default();
        account.tasks_completed = stats.tasks_completed;
        account.streak = stats.streak;
        account.balance = stats.balance;
        account.weekly_goals = stats.weekly_goals;
    }

    /// Register a mission on the progress contract
    pub fn register_mission(&self, mission: MissionDefinition) {
        self.state.lock().missions.insert(mission.mission_id, mission);
    }

    /// Current on-chain stats, bypassing faults and lag
    #[must_use]
    pub fn stats(&self, address: &Address) -> UserStats {
        self.state
            .lock()
            .accounts
            .get(address)
            .map(Account::stats)
            .unwrap_or_default()
    }

    /// The next signature request is declined with `message`
    pub fn reject_next_signature(&self, message: impl Into<String>) {
        self.faults.lock().reject_next = Some(message.into());
    }

    /// The next submitted call reverts with `reason`
    pub fn revert_next(&self, reason: impl Into<String>) {
        self.faults.lock().revert_next = Some(reason.into());
    }

    /// The next confirmation wait fails with `message` after inclusion
    pub fn fail_next_confirmation(&self, message: impl Into<String>) {
        self.faults.lock().drop_next_receipt = Some(message.into());
    }

    /// Make every read fail
    pub fn set_reads_failing(&self, failing: bool) {
        self.faults.lock().fail_reads = failing;
    }

    /// Emit receipts without logs
    pub fn set_omit_events(&self, omit: bool) {
        self.faults.lock().omit_events = omit;
    }

    /// Serve stats as they were before the writes made while lagging
    pub fn set_stats_lag(&self, lag: bool) {
        self.faults.lock().lag_stats = lag;
        if !lag {
            for account in self.state.lock().accounts.values_mut() {
                account.lagged = None;
            }
        }
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn check_reads(&self) -> Result<(), TransportError> {
        if self.faults.lock().fail_reads {
            return Err(TransportError::Rpc("network unreachable".to_string()));
        }
        Ok(())
    }

    fn tx_hash(from: &Address, nonce: u64, call: &ContractCall) -> Result<TxHash, TransportError> {
        let encoded = serde_json::to_vec(call).map_err(|e| TransportError::Rpc(e.to_string()))?;
        let mut hasher = Sha256::new();
        hasher.update(from.as_bytes());
        hasher.update(nonce.to_le_bytes());
        hasher.update(&encoded);
        Ok(TxHash::new(hasher.finalize().into()))
    }

    /// Apply `call` from `from`; `Err` carries the revert reason
    fn apply(state: &mut ChainState, from: &Address, call: &ContractCall, lag: bool) -> Result<Vec<LedgerEvent>, String> {
        let today = state.today();

        if lag {
            let account = state.accounts.entry(*from).or_default();
            if account.lagged.is_none() {
                account.lagged = Some(account.stats());
            }
        }

        match call {
            ContractCall::CompleteTask { task_id, priority } => {
                let account = state.accounts.entry(*from).or_default();
                if !account.completed_tasks.insert(*task_id) {
                    return Err("Task already completed".to_string());
                }
                let reward = task_reward(*priority);
                account.tasks_completed += 1;
                account.balance = account.balance.saturating_add(reward);

                let mut events = vec![LedgerEvent::TaskCompleted(TaskCompleted {
                    user: *from,
                    task_id: *task_id,
                    reward,
                })];
                if let Some(bonus) = account.touch_streak(today) {
                    events.push(LedgerEvent::StreakBonus(StreakBonus {
                        user: *from,
                        streak: account.streak,
                        bonus,
                    }));
                }
                Ok(events)
            }
            ContractCall::RewardFarcasterShare => {
                let account = state.accounts.entry(*from).or_default();
                account.shares += 1;
                account.balance = account.balance.saturating_add(SHARE_REWARD);
                Ok(vec![LedgerEvent::FarcasterShare(FarcasterShare {
                    user: *from,
                    reward: SHARE_REWARD,
                })])
            }
            ContractCall::CompleteWeeklyGoal { goal_id } => {
                let account = state.accounts.entry(*from).or_default();
                if !account.completed_goals.insert(*goal_id) {
                    return Err("Goal already completed".to_string());
                }
                account.weekly_goals += 1;
                account.balance = account.balance.saturating_add(WEEKLY_GOAL_REWARD);
                Ok(vec![LedgerEvent::WeeklyGoal(WeeklyGoal {
                    user: *from,
                    goal_id: *goal_id,
                    reward: WEEKLY_GOAL_REWARD,
                })])
            }
            ContractCall::Transfer { to, amount } => {
                if *amount == 0 {
                    return Err("Invalid amount".to_string());
                }
                let sender = state.accounts.entry(*from).or_default();
                if sender.balance < *amount {
                    return Err("Insufficient balance".to_string());
                }
                sender.balance -= amount;
                let recipient = state.accounts.entry(*to).or_default();
                recipient.balance = recipient.balance.saturating_add(*amount);
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl LedgerTransport for SimulatedLedger {
    async fn submit(&self, from: &Address, call: &ContractCall) -> Result<TxHash, TransportError> {
        self.delay().await;

        let (revert, omit_events, lag) = {
            let mut faults = self.faults.lock();
            if let Some(message) = faults.reject_next.take() {
                return Err(TransportError::Rejected(message));
            }
            (faults.revert_next.take(), faults.omit_events, faults.lag_stats)
        };

        let mut state = self.state.lock();
        state.nonce += 1;
        let tx_hash = Self::tx_hash(from, state.nonce, call)?;

        let (status, events) = match revert {
            Some(reason) => (ReceiptStatus::Reverted { reason }, Vec::new()),
            None => match Self::apply(&mut state, from, call, lag) {
                Ok(events) => (ReceiptStatus::Success, events),
                Err(reason) => (ReceiptStatus::Reverted { reason }, Vec::new()),
            },
        };

        let logs = if omit_events {
            Vec::new()
        } else {
            events
                .iter()
                .map(LedgerEvent::to_raw)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| TransportError::Rpc(e.to_string()))?
        };

        state.receipts.insert(tx_hash, Receipt { tx_hash, status, logs });
        tracing::trace!(from = %from, method = call.method(), tx_hash = %tx_hash, "simulated call included");
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> Result<Receipt, TransportError> {
        self.delay().await;

        if let Some(message) = self.faults.lock().drop_next_receipt.take() {
            return Err(TransportError::Timeout(message));
        }
        self.state
            .lock()
            .receipts
            .remove(tx_hash)
            .ok_or_else(|| TransportError::Rpc(format!("unknown transaction {tx_hash}")))
    }

    async fn read_user_stats(&self, address: &Address) -> Result<UserStats, TransportError> {
        self.delay().await;
        self.check_reads()?;
        let state = self.state.lock();
        Ok(state
            .accounts
            .get(address)
            .map(|a| a.lagged.unwrap_or_else(|| a.stats()))
            .unwrap_or_default())
    }

    async fn balance_of(&self, address: &Address) -> Result<u128, TransportError> {
        self.delay().await;
        self.check_reads()?;
        Ok(self.state.lock().accounts.get(address).map_or(0, |a| a.balance))
    }

    async fn mission_progress(&self, address: &Address, mission_id: u64) -> Result<u64, TransportError> {
        self.delay().await;
        self.check_reads()?;
        let state = self.state.lock();
        let mission = state
            .missions
            .get(&mission_id)
            .ok_or_else(|| TransportError::Rpc(format!("unknown mission {mission_id}")))?;
        let counters = state.accounts.get(address).map(Account::counters).unwrap_or_default();
        Ok(mission.approximate_progress(&counters))
    }
}
