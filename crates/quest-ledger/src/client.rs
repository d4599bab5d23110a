//! Typed ledger client
//!
//! Wraps a [`LedgerTransport`] with the failure policy of the reward layer:
//! - Reads degrade to "no data" (`None` / `0`) and never fail the caller
//! - Writes report failures as [`CompletionResult`] data, message verbatim
//! - Nothing is retried; every write is one user-initiated attempt

use crate::call::{ContractCall, ReceiptStatus};
use crate::events::{decode_logs, extract_reward, streak_bonus, RewardEvent, RewardExtraction};
use crate::transport::LedgerTransport;
use quest_types::{Address, CompletionResult, Priority, RewardSource, TxHash, UserStats};
use std::fmt;
use std::sync::Arc;

/// Share reward mirrored from the rewards contract
pub const DEFAULT_SHARE_REWARD: u128 = 5;

/// A reward-issuing write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardAction {
    CompleteTask { task_id: u64, priority: Priority },
    SocialShare,
    CompleteWeeklyGoal { goal_id: u64 },
}

impl RewardAction {
    /// Contract call for this action
    #[must_use]
    pub fn call(&self) -> ContractCall {
        match *self {
            Self::CompleteTask { task_id, priority } => ContractCall::CompleteTask { task_id, priority },
            Self::SocialShare => ContractCall::RewardFarcasterShare,
            Self::CompleteWeeklyGoal { goal_id } => ContractCall::CompleteWeeklyGoal { goal_id },
        }
    }

    /// Event that carries the reward amount
    #[must_use]
    pub fn reward_event(&self) -> RewardEvent {
        match self {
            Self::CompleteTask { .. } => RewardEvent::TaskCompleted,
            Self::SocialShare => RewardEvent::FarcasterShare,
            Self::CompleteWeeklyGoal { .. } => RewardEvent::WeeklyGoal,
        }
    }

    /// Short label for logs
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::CompleteTask { .. } => "complete_task",
            Self::SocialShare => "social_share",
            Self::CompleteWeeklyGoal { .. } => "complete_weekly_goal",
        }
    }
}

/// Client for the rewards and mission-progress contracts
///
/// Every operation takes the acting identity explicitly.
#[derive(Clone)]
pub struct LedgerClient {
    transport: Arc<dyn LedgerTransport>,
    share_reward: u128,
}

impl fmt::Debug for LedgerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerClient")
            .field("share_reward", &self.share_reward)
            .finish_non_exhaustive()
    }
}

impl LedgerClient {
    /// Create client over a transport
    #[must_use]
    pub fn new(transport: Arc<dyn LedgerTransport>) -> Self {
        Self {
            transport,
            share_reward: DEFAULT_SHARE_REWARD,
        }
    }

    /// With the share reward used when no `FarcasterShare` event is emitted
    #[inline]
    #[must_use]
    pub fn with_share_reward(mut self, reward: u128) -> Self {
        self.share_reward = reward;
        self
    }

    /// Configured share reward
    #[inline]
    #[must_use]
    pub fn share_reward(&self) -> u128 {
        self.share_reward
    }

    /// `completeTask(taskId, priority)`
    pub async fn complete_task(&self, identity: &Address, task_id: u64, priority: Priority) -> CompletionResult {
        self.execute(identity, RewardAction::CompleteTask { task_id, priority }, |_| {})
            .await
    }

    /// `rewardFarcasterShare()`
    pub async fn reward_social_share(&self, identity: &Address) -> CompletionResult {
        self.execute(identity, RewardAction::SocialShare, |_| {}).await
    }

    /// `completeWeeklyGoal(goalId)`
    pub async fn complete_weekly_goal(&self, identity: &Address, goal_id: u64) -> CompletionResult {
        self.execute(identity, RewardAction::CompleteWeeklyGoal { goal_id }, |_| {})
            .await
    }

    /// Submit `action`, wait for inclusion and extract the reward
    ///
    /// `on_broadcast` runs once the transaction has been signed and
    /// broadcast, before the confirmation wait.
    pub async fn execute<F>(&self, identity: &Address, action: RewardAction, on_broadcast: F) -> CompletionResult
    where
        F: FnOnce(&TxHash) + Send,
    {
        let call = action.call();
        tracing::debug!(identity = %identity, method = call.method(), "submitting ledger call");

        let tx_hash = match self.transport.submit(identity, &call).await {
            Ok(hash) => hash,
            Err(e) => {
                tracing::warn!(identity = %identity, action = action.label(), error = %e, "submission failed");
                return CompletionResult::failed(e.message());
            }
        };
        on_broadcast(&tx_hash);

        let receipt = match self.transport.wait_for_receipt(&tx_hash).await {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::warn!(tx_hash = %tx_hash, action = action.label(), error = %e, "confirmation failed");
                return CompletionResult::failed_with_tx(tx_hash, e.message());
            }
        };

        if let ReceiptStatus::Reverted { reason } = receipt.status {
            tracing::warn!(tx_hash = %tx_hash, action = action.label(), reason = %reason, "transaction reverted");
            return CompletionResult::failed_with_tx(tx_hash, reason);
        }

        let events = decode_logs(&receipt.logs);
        let bonus = streak_bonus(&events, identity);
        let result = match (extract_reward(&events, identity, action.reward_event()), action) {
            (RewardExtraction::Found(reward), _) => {
                CompletionResult::rewarded(tx_hash, reward, RewardSource::Event)
            }
            (RewardExtraction::NotFound, RewardAction::SocialShare) => {
                CompletionResult::rewarded(tx_hash, self.share_reward, RewardSource::Constant)
            }
            (RewardExtraction::NotFound, _) => {
                tracing::warn!(tx_hash = %tx_hash, action = action.label(), "no reward event for caller");
                CompletionResult::rewarded(tx_hash, 0, RewardSource::NotFound)
            }
        };

        tracing::info!(
            identity = %identity,
            action = action.label(),
            tx_hash = %tx_hash,
            reward = %result.reward,
            bonus = %bonus,
            "ledger call confirmed"
        );
        result.with_bonus(bonus)
    }

    /// `getUserStats(address)`; `None` on any read failure
    pub async fn get_user_stats(&self, address: &Address) -> Option<UserStats> {
        match self.transport.read_user_stats(address).await {
            Ok(stats) => Some(stats),
            Err(e) => {
                tracing::warn!(address = %address, error = %e, "user stats read failed");
                None
            }
        }
    }

    /// `balanceOf(address)`; `None` on any read failure
    pub async fn try_balance(&self, address: &Address) -> Option<u128> {
        match self.transport.balance_of(address).await {
            Ok(balance) => Some(balance),
            Err(e) => {
                tracing::warn!(address = %address, error = %e, "balance read failed");
                None
            }
        }
    }

    /// `balanceOf(address)`; `0` on any read failure
    pub async fn get_balance(&self, address: &Address) -> u128 {
        self.try_balance(address).await.unwrap_or(0)
    }

    /// Mission progress; `None` on any read failure
    pub async fn get_mission_progress(&self, address: &Address, mission_id: u64) -> Option<u64> {
        match self.transport.mission_progress(address, mission_id).await {
            Ok(progress) => Some(progress),
            Err(e) => {
                tracing::warn!(address = %address, mission_id, error = %e, "mission progress read failed");
                None
            }
        }
    }

    /// `transfer(to, amount)`; `false` on any failure
    pub async fn transfer(&self, identity: &Address, to: &Address, amount: u128) -> bool {
        let call = ContractCall::Transfer { to: *to, amount };
        let tx_hash = match self.transport.submit(identity, &call).await {
            Ok(hash) => hash,
            Err(e) => {
                tracing::warn!(identity = %identity, error = %e, "transfer submission failed");
                return false;
            }
        };
        match self.transport.wait_for_receipt(&tx_hash).await {
            Ok(receipt) if receipt.succeeded() => {
                tracing::info!(identity = %identity, to = %to, amount = %amount, tx_hash = %tx_hash, "transfer confirmed");
                true
            }
            Ok(receipt) => {
                tracing::warn!(tx_hash = %tx_hash, status = ?receipt.status, "transfer reverted");
                false
            }
            Err(e) => {
                tracing::warn!(tx_hash = %tx_hash, error = %e, "transfer confirmation failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::SimulatedLedger;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn alice() -> Address {
        Address::new([0xa1; 20])
    }

    fn bob() -> Address {
        Address::new([0xb0; 20])
    }

    fn client() -> (Arc<SimulatedLedger>, LedgerClient) {
        let ledger = Arc::new(SimulatedLedger::new());
        let client = LedgerClient::new(ledger.clone());
        (ledger, client)
    }

    #[tokio::test]
    async fn complete_task_reads_reward_from_event() {
        let (ledger, client) = client();

        let result = client.complete_task(&alice(), 7, Priority::High).await;

        assert!(result.success);
        assert_eq!(result.reward, 50);
        assert_eq!(result.reward_source, RewardSource::Event);
        assert!(result.tx_hash.is_some());
        assert_eq!(client.get_balance(&alice()).await, 50);
        assert_eq!(ledger.stats(&alice()).tasks_completed, 1);
    }

    #[tokio::test]
    async fn rejection_message_is_preserved() {
        let (ledger, client) = client();
        ledger.reject_next_signature("User rejected the request.");

        let result = client.complete_task(&alice(), 7, Priority::High).await;

        assert_eq!(result, CompletionResult::failed("User rejected the request."));
        assert_eq!(client.get_balance(&alice()).await, 0);
    }

    #[tokio::test]
    async fn revert_reason_is_preserved() {
        let (_ledger, client) = client();
        assert!(client.complete_weekly_goal(&alice(), 3).await.success);

        let result = client.complete_weekly_goal(&alice(), 3).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Goal already completed"));
        assert!(result.tx_hash.is_some());
        assert_eq!(result.reward, 0);
    }

    #[tokio::test]
    async fn missing_event_is_success_with_not_found() {
        let (ledger, client) = client();
        ledger.set_omit_events(true);

        let result = client.complete_task(&alice(), 1, Priority::Medium).await;

        assert!(result.success);
        assert_eq!(result.reward, 0);
        assert_eq!(result.reward_source, RewardSource::NotFound);
    }

    #[tokio::test]
    async fn share_reward_comes_from_event_when_present() {
        let (_ledger, client) = client();
        let client = client.with_share_reward(99);

        let result = client.reward_social_share(&alice()).await;

        assert_eq!(result.reward, crate::simulated::SHARE_REWARD);
        assert_eq!(result.reward_source, RewardSource::Event);
    }

    #[tokio::test]
    async fn share_reward_falls_back_to_constant() {
        let (ledger, client) = client();
        let client = client.with_share_reward(99);
        ledger.set_omit_events(true);

        let result = client.reward_social_share(&alice()).await;

        assert!(result.success);
        assert_eq!(result.reward, 99);
        assert_eq!(result.reward_source, RewardSource::Constant);
    }

    #[tokio::test]
    async fn confirmation_failure_keeps_tx_hash() {
        let (ledger, client) = client();
        ledger.fail_next_confirmation("request timed out");

        let result = client.complete_task(&alice(), 4, Priority::Low).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("request timed out"));
        assert!(result.tx_hash.is_some());
    }

    #[tokio::test]
    async fn on_broadcast_runs_only_after_signature() {
        let (ledger, client) = client();
        let called = AtomicBool::new(false);

        ledger.reject_next_signature("denied");
        client
            .execute(&alice(), RewardAction::SocialShare, |_| called.store(true, Ordering::SeqCst))
            .await;
        assert!(!called.load(Ordering::SeqCst));

        client
            .execute(&alice(), RewardAction::SocialShare, |_| called.store(true, Ordering::SeqCst))
            .await;
        assert!(called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn reads_degrade_to_no_data() {
        let (ledger, client) = client();
        ledger.credit(&alice(), 10);
        ledger.set_reads_failing(true);

        assert_eq!(client.get_user_stats(&alice()).await, None);
        assert_eq!(client.try_balance(&alice()).await, None);
        assert_eq!(client.get_balance(&alice()).await, 0);
        assert_eq!(client.get_mission_progress(&alice(), 1).await, None);
    }

    #[tokio::test]
    async fn transfer_reports_bool() {
        let (ledger, client) = client();
        ledger.credit(&alice(), 30);

        assert!(client.transfer(&alice(), &bob(), 20).await);
        assert!(!client.transfer(&alice(), &bob(), 20).await);

        ledger.reject_next_signature("denied");
        assert!(!client.transfer(&alice(), &bob(), 1).await);
        assert_eq!(client.get_balance(&bob()).await, 20);
    }
}
