//! Testing utilities for the quest workspace
//!
//! Shared fixtures: identities, a wired orchestrator over the simulated
//! ledger and an in-memory store, and a notifier that records calls.

#![allow(missing_docs)]

use chrono::NaiveDate;
use parking_lot::Mutex;
use quest_core::{Notifier, RewardOrchestrator, StaticSession, WalletSession};
use quest_ledger::{LedgerClient, SimulatedLedger};
use quest_store::{MemoryBackend, ProgressStore};
use quest_types::{Address, NewTask, Priority, RecordId};
use std::sync::Arc;

pub fn alice() -> Address {
    Address::new([0xa1; 20])
}

pub fn bob() -> Address {
    Address::new([0xb0; 20])
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

pub fn memory_store() -> Arc<ProgressStore> {
    Arc::new(ProgressStore::new(Arc::new(MemoryBackend::new())))
}

/// Notifier that keeps every `(title, reward)` it receives
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<(String, u128)>>,
}

impl RecordingNotifier {
    pub fn calls(&self) -> Vec<(String, u128)> {
        self.calls.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, reward: u128) {
        self.calls.lock().push((title.to_string(), reward));
    }
}

/// Orchestrator plus handles on everything behind it
pub struct Harness {
    pub chain: Arc<SimulatedLedger>,
    pub store: Arc<ProgressStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub orchestrator: RewardOrchestrator,
}

impl Harness {
    /// Alice connected and signing
    pub fn new() -> Self {
        Self::with_session(Arc::new(StaticSession::connected(alice())))
    }

    pub fn with_session(session: Arc<dyn WalletSession>) -> Self {
        Self::build(Arc::new(SimulatedLedger::new()), session, |ledger| ledger)
    }

    pub fn with_share_reward(reward: u128) -> Self {
        Self::build(
            Arc::new(SimulatedLedger::new()),
            Arc::new(StaticSession::connected(alice())),
            move |ledger| ledger.with_share_reward(reward),
        )
    }

    fn build(
        chain: Arc<SimulatedLedger>,
        session: Arc<dyn WalletSession>,
        configure: impl FnOnce(LedgerClient) -> LedgerClient,
    ) -> Self {
        let store = memory_store();
        let notifier = Arc::new(RecordingNotifier::default());
        let ledger = Arc::new(configure(LedgerClient::new(chain.clone())));
        let orchestrator =
            RewardOrchestrator::new(ledger, store.clone(), session).with_notifier(notifier.clone());
        Self {
            chain,
            store,
            notifier,
            orchestrator,
        }
    }

    pub fn add_task(&self, title: &str, priority: Priority) -> RecordId {
        self.store
            .add_task(&alice(), NewTask::new(title).with_priority(priority))
            .unwrap()
            .id
    }

    /// Complete `n` tasks locally without touching the ledger
    pub fn complete_locally(&self, n: usize) {
        for i in 0..n {
            let id = self.add_task(&format!("offline {i}"), Priority::Medium);
            self.store.begin_task_completion(&alice(), id).unwrap();
            self.store
                .commit_task_completion(&alice(), id, chrono::Utc::now())
                .unwrap();
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
