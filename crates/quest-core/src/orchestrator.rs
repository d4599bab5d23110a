//! Reward orchestrator
//!
//! Drives one user-initiated reward action end to end:
//! 1. Check session preconditions; fail without touching the network
//! 2. Mark the local record pending
//! 3. Submit through the ledger client and wait for confirmation
//! 4. Commit or roll back the local record from the result
//! 5. On success, refresh both ledger reads and reconcile before returning
//!
//! Every outcome is a [`CompletionResult`]; nothing is retried.

use crate::cache::StatsCache;
use crate::config::QuestConfig;
use crate::notify::{NoopNotifier, Notifier};
use crate::phase::{ActionGuard, ActionTracker, RewardPhase};
use crate::reconciler::Reconciler;
use crate::session::{self, WalletSession};
use chrono::Utc;
use dashmap::DashMap;
use quest_ledger::{LedgerClient, LedgerTransport, RewardAction};
use quest_store::{ProgressStore, StoreBackend};
use quest_types::{Address, CompletionResult, Mission, MissionDefinition, RecordId, UserStats};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Notification title for a rewarded share
pub const SHARE_TITLE: &str = "Shared on Farcaster";

/// Result of a completion action plus the view it produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOutcome {
    pub result: CompletionResult,
    /// Reconciled view after a success; `None` on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<UserStats>,
}

impl CompletionOutcome {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            result: CompletionResult::failed(message),
            stats: None,
        }
    }
}

/// Orchestrates reward actions for any number of identities
pub struct RewardOrchestrator {
    ledger: Arc<LedgerClient>,
    store: Arc<ProgressStore>,
    reconciler: Reconciler,
    session: Arc<dyn WalletSession>,
    notifier: Arc<dyn Notifier>,
    tracker: ActionTracker,
    views: StatsCache,
    served: DashMap<Address, UserStats>,
}

impl fmt::Debug for RewardOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RewardOrchestrator")
            .field("ledger", &self.ledger)
            .field("reconciler", &self.reconciler)
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}

impl RewardOrchestrator {
    /// Create orchestrator with no missions and a silent notifier
    #[must_use]
    pub fn new(ledger: Arc<LedgerClient>, store: Arc<ProgressStore>, session: Arc<dyn WalletSession>) -> Self {
        Self {
            reconciler: Reconciler::new(ledger.clone(), store.clone()),
            ledger,
            store,
            session,
            notifier: Arc::new(NoopNotifier),
            tracker: ActionTracker::new(),
            views: StatsCache::default(),
            served: DashMap::new(),
        }
    }

    /// Wire an orchestrator from configuration
    #[must_use]
    pub fn from_config(
        config: &QuestConfig,
        transport: Arc<dyn LedgerTransport>,
        backend: Arc<dyn StoreBackend>,
        session: Arc<dyn WalletSession>,
    ) -> Self {
        let ledger = Arc::new(LedgerClient::new(transport).with_share_reward(config.ledger.share_reward()));
        let store = Arc::new(ProgressStore::new(backend));
        Self::new(ledger, store, session)
            .with_missions(config.missions.clone())
            .with_cache(StatsCache::with_ttl(config.cache.max_identities, config.cache.ttl()))
    }

    /// With notification surface
    #[inline]
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// With mission definitions
    #[inline]
    #[must_use]
    pub fn with_missions(mut self, missions: Vec<MissionDefinition>) -> Self {
        self.reconciler = self.reconciler.with_missions(missions);
        self
    }

    /// With view cache
    #[inline]
    #[must_use]
    pub fn with_cache(mut self, views: StatsCache) -> Self {
        self.views = views;
        self
    }

    /// Local progress store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    /// Ledger client
    #[inline]
    #[must_use]
    pub fn ledger(&self) -> &LedgerClient {
        &self.ledger
    }

    /// Whether any action is in flight for `identity`
    #[inline]
    #[must_use]
    pub fn is_busy(&self, identity: &Address) -> bool {
        self.tracker.is_busy(identity)
    }

    /// Current phase for `identity`
    #[inline]
    #[must_use]
    pub fn phase(&self, identity: &Address) -> RewardPhase {
        self.tracker.phase(identity)
    }

    /// Last view served to `identity`
    pub async fn last_view(&self, identity: &Address) -> Option<UserStats> {
        self.views.get(identity).await
    }

    /// Complete a task and collect its reward
    pub async fn complete_task(&self, identity: &Address, id: RecordId) -> CompletionOutcome {
        if let Err(message) = session::check(self.session.as_ref(), identity) {
            return CompletionOutcome::failed(message);
        }
        let task = match self.store.begin_task_completion(identity, id) {
            Ok(task) => task,
            Err(e) => return CompletionOutcome::failed(e.to_string()),
        };
        tracing::info!(identity = %identity, task_id = %id, ledger_id = task.ledger_id, "completing task");

        let action = RewardAction::CompleteTask {
            task_id: task.ledger_id,
            priority: task.priority,
        };
        let (guard, floor, result) = self.submit(identity, action).await;

        if result.success {
            if let Err(e) = self.store.commit_task_completion(identity, id, Utc::now()) {
                tracing::error!(identity = %identity, task_id = %id, error = %e, "confirmed task could not be committed locally");
            }
            self.finish(identity, guard, floor, result, &task.title).await
        } else {
            if let Err(e) = self.store.abort_task_completion(identity, id) {
                tracing::error!(identity = %identity, task_id = %id, error = %e, "pending task could not be rolled back");
            }
            Self::failed(identity, guard, result)
        }
    }

    /// Complete a weekly goal and collect its reward
    pub async fn complete_goal(&self, identity: &Address, id: RecordId) -> CompletionOutcome {
        if let Err(message) = session::check(self.session.as_ref(), identity) {
            return CompletionOutcome::failed(message);
        }
        let goal = match self.store.begin_goal_completion(identity, id) {
            Ok(goal) => goal,
            Err(e) => return CompletionOutcome::failed(e.to_string()),
        };
        tracing::info!(identity = %identity, goal_id = %id, ledger_id = goal.ledger_id, "completing weekly goal");

        let action = RewardAction::CompleteWeeklyGoal { goal_id: goal.ledger_id };
        let (guard, floor, result) = self.submit(identity, action).await;

        if result.success {
            if let Err(e) = self.store.commit_goal_completion(identity, id, Utc::now()) {
                tracing::error!(identity = %identity, goal_id = %id, error = %e, "confirmed goal could not be committed locally");
            }
            self.finish(identity, guard, floor, result, &goal.title).await
        } else {
            if let Err(e) = self.store.abort_goal_completion(identity, id) {
                tracing::error!(identity = %identity, goal_id = %id, error = %e, "pending goal could not be rolled back");
            }
            Self::failed(identity, guard, result)
        }
    }

    /// Reward a social share
    pub async fn share(&self, identity: &Address) -> CompletionOutcome {
        if let Err(message) = session::check(self.session.as_ref(), identity) {
            return CompletionOutcome::failed(message);
        }
        tracing::info!(identity = %identity, "rewarding social share");

        let (guard, floor, result) = self.submit(identity, RewardAction::SocialShare).await;
        if result.success {
            self.finish(identity, guard, floor, result, SHARE_TITLE).await
        } else {
            Self::failed(identity, guard, result)
        }
    }

    /// Transfer tokens; `false` on any failure
    ///
    /// The cached view's balance is refreshed after a confirmed transfer.
    pub async fn transfer(&self, identity: &Address, to: &Address, amount: u128) -> bool {
        if let Err(message) = session::check(self.session.as_ref(), identity) {
            tracing::warn!(identity = %identity, reason = message, "transfer precondition failed");
            return false;
        }
        let _guard = self.tracker.begin(*identity, "transfer");
        if !self.ledger.transfer(identity, to, amount).await {
            return false;
        }

        let view = self.floor(identity).await;
        let balance = self.ledger.get_balance(identity).await;
        self.serve(identity, UserStats { balance, ..view }).await;
        true
    }

    /// Manual reconciliation
    pub async fn refresh(&self, identity: &Address) -> UserStats {
        let stats = self.reconciler.refresh(identity).await;
        self.serve(identity, stats).await;
        stats
    }

    /// Progress of every configured mission
    pub async fn missions(&self, identity: &Address) -> Vec<Mission> {
        self.reconciler.missions(identity).await
    }

    /// Switch the active identity
    ///
    /// Drops the previous identity's view and counter floor, reopens records the next
    /// identity left pending in an earlier session, and reconciles.
    pub async fn on_identity_changed(&self, previous: Option<&Address>, next: Option<&Address>) -> Option<UserStats> {
        if let Some(previous) = previous {
            self.views.invalidate(previous).await;
            self.served.remove(previous);
        }
        let next = next?;
        if !self.tracker.is_busy(next) {
            if let Err(e) = self.store.clear_stale_pending(next) {
                tracing::warn!(identity = %next, error = %e, "stale pending records not cleared");
            }
        }
        Some(self.refresh(next).await)
    }

    async fn submit(&self, identity: &Address, action: RewardAction) -> (ActionGuard<'_>, UserStats, CompletionResult) {
        let guard = self.tracker.begin(*identity, action.label());
        let floor = self.floor(identity).await;

        let result = self
            .ledger
            .execute(identity, action, |_| {
                if let Err(e) = guard.advance(RewardPhase::AwaitingConfirmation) {
                    tracing::warn!(identity = %identity, error = %e, "phase not advanced");
                }
            })
            .await;
        (guard, floor, result)
    }

    async fn finish(
        &self,
        identity: &Address,
        guard: ActionGuard<'_>,
        floor: UserStats,
        result: CompletionResult,
        title: &str,
    ) -> CompletionOutcome {
        if let Err(e) = guard.advance(RewardPhase::Reconciling) {
            tracing::warn!(identity = %identity, error = %e, "phase not advanced");
        }

        let stats = self.reconciler.refresh(identity).await.at_least(&floor);
        self.serve(identity, stats).await;
        self.notifier.notify(title, result.total_reward());
        drop(guard);

        tracing::info!(
            identity = %identity,
            reward = %result.reward,
            bonus = %result.bonus,
            tasks_completed = stats.tasks_completed,
            balance = %stats.balance,
            "reward action completed"
        );
        CompletionOutcome {
            result,
            stats: Some(stats),
        }
    }

    /// Counters a new view must not drop below
    ///
    /// The served map outlives cache expiry and eviction; only an
    /// identity change clears it.
    async fn floor(&self, identity: &Address) -> UserStats {
        let mut floor = self.reconciler.local_snapshot(identity).to_stats();
        if let Some(cached) = self.views.get(identity).await {
            floor = cached.at_least(&floor);
        }
        if let Some(served) = self.served.get(identity) {
            floor = floor.at_least(&served);
        }
        floor
    }

    async fn serve(&self, identity: &Address, stats: UserStats) {
        self.served.insert(*identity, stats);
        self.views.insert(*identity, stats).await;
    }

    fn failed(identity: &Address, guard: ActionGuard<'_>, result: CompletionResult) -> CompletionOutcome {
        drop(guard);
        tracing::info!(
            identity = %identity,
            error = result.error.as_deref().unwrap_or_default(),
            "reward action failed"
        );
        CompletionOutcome { result, stats: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MockNotifier;
    use crate::session::{MockWalletSession, StaticSession, WALLET_NOT_CONNECTED};
    use quest_ledger::SimulatedLedger;
    use quest_store::MemoryBackend;
    use quest_types::{NewGoal, NewTask, Priority, RewardSource};

    const ALICE: Address = Address::new([0xa1; 20]);
    const BOB: Address = Address::new([0xb0; 20]);

    fn orchestrator(chain: &Arc<SimulatedLedger>, session: Arc<dyn WalletSession>) -> RewardOrchestrator {
        let ledger = Arc::new(LedgerClient::new(chain.clone()));
        let store = Arc::new(ProgressStore::new(Arc::new(MemoryBackend::new())));
        RewardOrchestrator::new(ledger, store, session)
    }

    fn connected() -> Arc<dyn WalletSession> {
        Arc::new(StaticSession::connected(ALICE))
    }

    fn add_task(orch: &RewardOrchestrator, title: &str, priority: Priority) -> RecordId {
        orch.store()
            .add_task(&ALICE, NewTask::new(title).with_priority(priority))
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn disconnected_wallet_short_circuits() {
        let chain = Arc::new(SimulatedLedger::new());
        let mut session = MockWalletSession::new();
        session.expect_connected_address().return_const(None::<Address>);
        let orch = orchestrator(&chain, Arc::new(session));
        let id = add_task(&orch, "Write docs", Priority::High);

        let outcome = orch.complete_task(&ALICE, id).await;

        assert!(!outcome.result.success);
        assert_eq!(outcome.result.error.as_deref(), Some(WALLET_NOT_CONNECTED));
        let task = orch.store().task(&ALICE, id).unwrap().unwrap();
        assert!(!task.completed && !task.pending);
        assert_eq!(chain.stats(&ALICE), UserStats::default());
    }

    #[tokio::test]
    async fn success_commits_notifies_and_reconciles() {
        let chain = Arc::new(SimulatedLedger::new());
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|title, reward| title == "Write docs" && *reward == 50)
            .times(1)
            .return_const(());
        let orch = orchestrator(&chain, connected()).with_notifier(Arc::new(notifier));
        let id = add_task(&orch, "Write docs", Priority::High);

        let outcome = orch.complete_task(&ALICE, id).await;

        assert!(outcome.result.success);
        assert_eq!(outcome.result.reward, 50);
        assert_eq!(outcome.result.reward_source, RewardSource::Event);
        let stats = outcome.stats.unwrap();
        assert_eq!(stats.tasks_completed, 1);
        assert_eq!(stats.balance, 50);

        let task = orch.store().task(&ALICE, id).unwrap().unwrap();
        assert!(task.completed && !task.pending);
        assert!(task.completed_at.is_some());
        assert_eq!(orch.phase(&ALICE), RewardPhase::Idle);
        assert_eq!(orch.last_view(&ALICE).await, Some(stats));
    }

    #[tokio::test]
    async fn rejection_rolls_back_without_notifying() {
        let chain = Arc::new(SimulatedLedger::new());
        chain.reject_next_signature("User rejected the request.");
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().never();
        let orch = orchestrator(&chain, connected()).with_notifier(Arc::new(notifier));
        let id = add_task(&orch, "Write docs", Priority::Low);

        let outcome = orch.complete_task(&ALICE, id).await;

        assert!(!outcome.result.success);
        assert_eq!(outcome.result.reward, 0);
        assert_eq!(outcome.result.error.as_deref(), Some("User rejected the request."));
        assert!(outcome.stats.is_none());
        let task = orch.store().task(&ALICE, id).unwrap().unwrap();
        assert!(!task.completed && !task.pending);
        assert!(!orch.is_busy(&ALICE));
    }

    #[tokio::test]
    async fn completed_and_pending_records_are_refused() {
        let chain = Arc::new(SimulatedLedger::new());
        let orch = orchestrator(&chain, connected());
        let done = add_task(&orch, "done", Priority::Medium);
        assert!(orch.complete_task(&ALICE, done).await.result.success);

        let again = orch.complete_task(&ALICE, done).await;
        assert_eq!(again.result.error.as_deref(), Some("Task already completed"));

        let waiting = add_task(&orch, "waiting", Priority::Medium);
        orch.store().begin_task_completion(&ALICE, waiting).unwrap();
        let pending = orch.complete_task(&ALICE, waiting).await;
        assert_eq!(pending.result.error.as_deref(), Some("Task completion already pending"));

        let missing = orch.complete_task(&ALICE, RecordId::new()).await;
        assert_eq!(missing.result.error.as_deref(), Some("Task not found"));
    }

    #[tokio::test]
    async fn weekly_goal_reward() {
        let chain = Arc::new(SimulatedLedger::new());
        let orch = orchestrator(&chain, connected());
        let week = Utc::now().date_naive();
        let goal = orch.store().add_goal(&ALICE, NewGoal::new("Ship", week)).unwrap();

        let outcome = orch.complete_goal(&ALICE, goal.id).await;

        assert!(outcome.result.success);
        assert_eq!(outcome.result.reward, 100);
        assert_eq!(outcome.stats.unwrap().weekly_goals, 1);
        assert!(orch.store().goal(&ALICE, goal.id).unwrap().unwrap().completed);
    }

    #[tokio::test]
    async fn share_falls_back_to_configured_constant() {
        let chain = Arc::new(SimulatedLedger::new());
        chain.set_omit_events(true);
        let ledger = Arc::new(LedgerClient::new(chain.clone()).with_share_reward(7));
        let store = Arc::new(ProgressStore::new(Arc::new(MemoryBackend::new())));
        let orch = RewardOrchestrator::new(ledger, store, connected());

        let outcome = orch.share(&ALICE).await;

        assert!(outcome.result.success);
        assert_eq!(outcome.result.reward, 7);
        assert_eq!(outcome.result.reward_source, RewardSource::Constant);
    }

    #[tokio::test]
    async fn success_never_lowers_counters() {
        let chain = Arc::new(SimulatedLedger::new());
        chain.seed_stats(
            &ALICE,
            UserStats {
                tasks_completed: 5,
                streak: 3,
                balance: 120,
                weekly_goals: 2,
            },
        );
        let orch = orchestrator(&chain, connected());
        let before = orch.refresh(&ALICE).await;
        assert_eq!(before.tasks_completed, 5);

        chain.set_reads_failing(true);
        let id = add_task(&orch, "offline read", Priority::Medium);
        let outcome = orch.complete_task(&ALICE, id).await;

        assert!(outcome.result.success);
        let after = outcome.stats.unwrap();
        assert!(after.tasks_completed >= before.tasks_completed);
        assert!(after.weekly_goals >= before.weekly_goals);
        assert!(after.streak >= before.streak);
    }

    #[tokio::test]
    async fn transfer_updates_cached_balance() {
        let chain = Arc::new(SimulatedLedger::new());
        chain.credit(&ALICE, 100);
        let orch = orchestrator(&chain, connected());
        orch.refresh(&ALICE).await;

        assert!(orch.transfer(&ALICE, &BOB, 40).await);
        assert_eq!(orch.last_view(&ALICE).await.unwrap().balance, 60);
        assert!(!orch.transfer(&ALICE, &BOB, 1000).await);
        assert_eq!(chain.stats(&BOB).balance, 40);
    }

    #[tokio::test]
    async fn overlapping_completions_both_land() {
        let chain = Arc::new(SimulatedLedger::new());
        let orch = orchestrator(&chain, connected());
        let first = add_task(&orch, "first", Priority::High);
        let second = add_task(&orch, "second", Priority::Low);

        let (a, b) = tokio::join!(orch.complete_task(&ALICE, first), orch.complete_task(&ALICE, second));

        assert!(a.result.success);
        assert!(b.result.success);
        assert_eq!(chain.stats(&ALICE).tasks_completed, 2);
        assert_eq!(chain.stats(&ALICE).balance, 50 + 10);
        for id in [first, second] {
            let task = orch.store().task(&ALICE, id).unwrap().unwrap();
            assert!(task.completed && !task.pending);
        }
        assert!(!orch.is_busy(&ALICE));
        assert_eq!(orch.last_view(&ALICE).await.unwrap().tasks_completed, 2);
    }

    #[tokio::test]
    async fn identity_change_reopens_stale_pending() {
        let chain = Arc::new(SimulatedLedger::new());
        let orch = orchestrator(&chain, connected());
        let id = add_task(&orch, "interrupted", Priority::Medium);
        orch.store().begin_task_completion(&ALICE, id).unwrap();

        let view = orch.on_identity_changed(Some(&BOB), Some(&ALICE)).await;

        assert!(view.is_some());
        assert!(!orch.store().task(&ALICE, id).unwrap().unwrap().pending);
        assert!(orch.on_identity_changed(Some(&ALICE), None).await.is_none());
        assert!(orch.last_view(&ALICE).await.is_none());
    }
}
