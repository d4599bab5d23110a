//! Reconciliation of local and ledger progress
//!
//! [`reconcile`] is the pure projection `(LocalSnapshot, LedgerSnapshot) -> UserStats`:
//! - `tasks_completed`, `streak`, `weekly_goals`: per-field maximum
//! - `balance`: ledger value, never derived locally
//!
//! The max policy never shows a regression while either side catches up,
//! and therefore cannot express a ledger-side correction downwards.

use futures::future::join_all;
use quest_ledger::LedgerClient;
use quest_store::ProgressStore;
use quest_types::{
    Address, LedgerSnapshot, LocalSnapshot, Mission, MissionDefinition, ProgressSource, UserStats,
};
use std::sync::Arc;

/// Merge the two snapshots into the rendered view
#[must_use]
pub fn reconcile(local: &LocalSnapshot, ledger: &LedgerSnapshot) -> UserStats {
    let local_view = local.to_stats();
    let counters = match ledger.stats {
        Some(remote) => UserStats {
            tasks_completed: local.tasks_completed.max(remote.tasks_completed),
            streak: local.streak.max(remote.streak),
            balance: 0,
            weekly_goals: local.weekly_goals.max(remote.weekly_goals),
        },
        None => local_view,
    };
    UserStats {
        balance: ledger.balance(),
        ..counters
    }
}

/// Mission progress, ledger first, local approximation second
#[must_use]
pub fn reconcile_mission(definition: &MissionDefinition, local: &LocalSnapshot, ledger: Option<u64>) -> Mission {
    let (progress, source) = match ledger {
        Some(progress) => (progress, ProgressSource::Ledger),
        None => (definition.approximate_progress(local), ProgressSource::LocalApproximation),
    };
    Mission {
        mission_id: definition.mission_id,
        target: definition.target,
        progress,
        source,
    }
}

/// Reads both sources and reconciles them
///
/// Performs no writes.
#[derive(Debug, Clone)]
pub struct Reconciler {
    ledger: Arc<LedgerClient>,
    store: Arc<ProgressStore>,
    missions: Vec<MissionDefinition>,
}

impl Reconciler {
    /// Create reconciler
    #[must_use]
    pub fn new(ledger: Arc<LedgerClient>, store: Arc<ProgressStore>) -> Self {
        Self {
            ledger,
            store,
            missions: Vec::new(),
        }
    }

    /// With mission definitions
    #[inline]
    #[must_use]
    pub fn with_missions(mut self, missions: Vec<MissionDefinition>) -> Self {
        self.missions = missions;
        self
    }

    /// Configured missions
    #[inline]
    #[must_use]
    pub fn mission_definitions(&self) -> &[MissionDefinition] {
        &self.missions
    }

    /// Local counters; an unreadable store counts as empty
    #[must_use]
    pub fn local_snapshot(&self, identity: &Address) -> LocalSnapshot {
        self.store.snapshot(identity).unwrap_or_else(|e| {
            tracing::warn!(identity = %identity, error = %e, "local snapshot unavailable");
            LocalSnapshot::default()
        })
    }

    /// `getUserStats` and `balanceOf`, issued concurrently
    pub async fn ledger_snapshot(&self, identity: &Address) -> LedgerSnapshot {
        let (stats, balance) = futures::join!(
            self.ledger.get_user_stats(identity),
            self.ledger.try_balance(identity)
        );
        LedgerSnapshot { stats, balance }
    }

    /// Current reconciled view for `identity`
    pub async fn refresh(&self, identity: &Address) -> UserStats {
        let ledger = self.ledger_snapshot(identity).await;
        let local = self.local_snapshot(identity);
        let stats = reconcile(&local, &ledger);
        tracing::debug!(
            identity = %identity,
            ledger_stats = ledger.stats.is_some(),
            ledger_balance = ledger.balance.is_some(),
            tasks_completed = stats.tasks_completed,
            balance = %stats.balance,
            "reconciled"
        );
        stats
    }

    /// Progress of every configured mission
    pub async fn missions(&self, identity: &Address) -> Vec<Mission> {
        let local = self.local_snapshot(identity);
        let reads = join_all(
            self.missions
                .iter()
                .map(|m| self.ledger.get_mission_progress(identity, m.mission_id)),
        )
        .await;

        self.missions
            .iter()
            .zip(reads)
            .map(|(definition, ledger)| reconcile_mission(definition, &local, ledger))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use quest_ledger::SimulatedLedger;
    use quest_store::MemoryBackend;
    use quest_types::{MissionCounter, NewTask};

    const ALICE: Address = Address::new([0xa1; 20]);

    fn local(tasks: u64, streak: u64, goals: u64) -> LocalSnapshot {
        LocalSnapshot {
            tasks_completed: tasks,
            streak,
            weekly_goals: goals,
        }
    }

    fn remote(tasks: u64, streak: u64, balance: u128, goals: u64) -> UserStats {
        UserStats {
            tasks_completed: tasks,
            streak,
            balance,
            weekly_goals: goals,
        }
    }

    fn setup() -> (Arc<SimulatedLedger>, Arc<ProgressStore>, Reconciler) {
        let chain = Arc::new(SimulatedLedger::new());
        let ledger = Arc::new(LedgerClient::new(chain.clone()));
        let store = Arc::new(ProgressStore::new(Arc::new(MemoryBackend::new())));
        let reconciler = Reconciler::new(ledger, store.clone());
        (chain, store, reconciler)
    }

    fn complete_local(store: &ProgressStore, n: usize) {
        for i in 0..n {
            let task = store.add_task(&ALICE, NewTask::new(format!("task {i}"))).unwrap();
            store.begin_task_completion(&ALICE, task.id).unwrap();
            store.commit_task_completion(&ALICE, task.id, Utc::now()).unwrap();
        }
    }

    #[test]
    fn ledger_ahead_wins_counters_and_balance() {
        let ledger = LedgerSnapshot {
            stats: Some(remote(5, 0, 120, 0)),
            balance: Some(120),
        };
        let view = reconcile(&local(3, 0, 0), &ledger);
        assert_eq!(view.tasks_completed, 5);
        assert_eq!(view.balance, 120);
    }

    #[test]
    fn local_ahead_keeps_local_counters() {
        let ledger = LedgerSnapshot {
            stats: Some(remote(1, 0, 10, 0)),
            balance: Some(10),
        };
        let view = reconcile(&local(4, 2, 1), &ledger);
        assert_eq!(view, remote(4, 2, 10, 1));
    }

    #[test]
    fn unavailable_ledger_degrades_to_local() {
        let view = reconcile(&local(3, 2, 1), &LedgerSnapshot::UNAVAILABLE);
        assert_eq!(view, remote(3, 2, 0, 1));
    }

    #[test]
    fn balance_read_survives_stats_failure() {
        let ledger = LedgerSnapshot {
            stats: None,
            balance: Some(75),
        };
        assert_eq!(reconcile(&local(2, 1, 0), &ledger), remote(2, 1, 75, 0));
    }

    #[test]
    fn mission_prefers_ledger() {
        let def = MissionDefinition::new(1, 5);
        let m = reconcile_mission(&def, &local(7, 0, 0), Some(4));
        assert_eq!(m.progress, 4);
        assert_eq!(m.source, ProgressSource::Ledger);
    }

    #[test]
    fn mission_falls_back_to_local_modulo_target() {
        let def = MissionDefinition::new(1, 5).with_counter(MissionCounter::Tasks);
        let m = reconcile_mission(&def, &local(7, 0, 0), None);
        assert_eq!(m.progress, 2);
        assert_eq!(m.source, ProgressSource::LocalApproximation);
    }

    #[tokio::test]
    async fn refresh_merges_store_and_chain() {
        let (chain, store, reconciler) = setup();
        chain.seed_stats(&ALICE, remote(5, 1, 120, 0));
        complete_local(&store, 3);

        let view = reconciler.refresh(&ALICE).await;
        assert_eq!(view.tasks_completed, 5);
        assert_eq!(view.balance, 120);
    }

    #[tokio::test]
    async fn refresh_with_rpc_down_is_local_only() {
        let (chain, store, reconciler) = setup();
        chain.seed_stats(&ALICE, remote(5, 1, 120, 0));
        chain.set_reads_failing(true);
        complete_local(&store, 3);

        let view = reconciler.refresh(&ALICE).await;
        assert_eq!(view.tasks_completed, 3);
        assert_eq!(view.streak, 1);
        assert_eq!(view.balance, 0);
    }

    #[tokio::test]
    async fn missions_mix_sources() {
        let (chain, store, reconciler) = setup();
        let registered = MissionDefinition::new(1, 3);
        chain.register_mission(registered.clone());
        chain.seed_stats(&ALICE, remote(4, 0, 0, 0));
        complete_local(&store, 2);

        let reconciler = reconciler.with_missions(vec![registered, MissionDefinition::new(2, 5)]);
        let missions = reconciler.missions(&ALICE).await;

        assert_eq!(missions.len(), 2);
        assert_eq!(missions[0].progress, 1);
        assert_eq!(missions[0].source, ProgressSource::Ledger);
        assert_eq!(missions[1].progress, 2);
        assert_eq!(missions[1].source, ProgressSource::LocalApproximation);
    }

    fn any_stats() -> impl Strategy<Value = UserStats> {
        (0u64..1000, 0u64..100, any::<u128>(), 0u64..100).prop_map(|(t, s, b, g)| remote(t, s, b, g))
    }

    proptest! {
        #[test]
        fn prop_counters_are_per_field_max(
            (lt, ls, lg) in (0u64..1000, 0u64..100, 0u64..100),
            stats in any_stats(),
        ) {
            let local = local(lt, ls, lg);
            let ledger = LedgerSnapshot { stats: Some(stats), balance: Some(stats.balance) };
            let view = reconcile(&local, &ledger);
            prop_assert_eq!(view.tasks_completed, lt.max(stats.tasks_completed));
            prop_assert_eq!(view.streak, ls.max(stats.streak));
            prop_assert_eq!(view.weekly_goals, lg.max(stats.weekly_goals));
        }

        #[test]
        fn prop_balance_is_ledger_only(
            (lt, ls, lg) in (0u64..1000, 0u64..100, 0u64..100),
            stats in proptest::option::of(any_stats()),
            balance in proptest::option::of(any::<u128>()),
        ) {
            let ledger = LedgerSnapshot { stats, balance };
            let view = reconcile(&local(lt, ls, lg), &ledger);
            prop_assert_eq!(view.balance, ledger.balance());
        }
    }
}
