//! Reward action phases
//!
//! Every completion action walks
//! `Idle → Submitting → AwaitingConfirmation → Reconciling → Idle`, or
//! falls back to `Idle` from either write phase on failure. The tracker
//! records the phase of each in-flight action so the UI can disable its
//! controls; it does not reject overlapping actions.

use crate::error::PhaseError;
use dashmap::DashMap;
use quest_types::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Phase of a single reward action
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RewardPhase {
    /// No action in flight
    Idle,
    /// Signature requested
    Submitting,
    /// Broadcast, waiting for inclusion
    AwaitingConfirmation,
    /// Confirmed, refreshing stats and balance
    Reconciling,
}

/// Phases reachable from `from`
#[must_use]
pub fn allowed_transitions(from: RewardPhase) -> Vec<RewardPhase> {
    match from {
        RewardPhase::Idle => vec![RewardPhase::Submitting],
        RewardPhase::Submitting => vec![RewardPhase::AwaitingConfirmation, RewardPhase::Idle],
        RewardPhase::AwaitingConfirmation => vec![RewardPhase::Reconciling, RewardPhase::Idle],
        RewardPhase::Reconciling => vec![RewardPhase::Idle],
    }
}

/// Validate a phase transition
///
/// # Errors
/// Returns [`PhaseError::IllegalTransition`] if `to` is not reachable from `from`
pub fn validate_transition(from: RewardPhase, to: RewardPhase) -> Result<(), PhaseError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(PhaseError::IllegalTransition { from, to })
    }
}

/// Identifier of one tracked action
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActionId(pub Ulid);

impl ActionId {
    /// Generate new action ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct TrackedAction {
    identity: Address,
    label: &'static str,
    phase: RewardPhase,
}

/// Phases of all in-flight actions
#[derive(Debug, Default)]
pub struct ActionTracker {
    actions: DashMap<ActionId, TrackedAction>,
}

impl ActionTracker {
    /// Create empty tracker
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking an action in `Submitting`
    ///
    /// The returned guard moves the action back to `Idle` when dropped.
    #[must_use]
    pub fn begin(&self, identity: Address, label: &'static str) -> ActionGuard<'_> {
        let id = ActionId::new();
        self.actions.insert(
            id,
            TrackedAction {
                identity,
                label,
                phase: RewardPhase::Submitting,
            },
        );
        tracing::debug!(action_id = %id, identity = %identity, label, "action submitting");
        ActionGuard { tracker: self, id }
    }

    /// Whether any action is in flight for `identity`
    #[must_use]
    pub fn is_busy(&self, identity: &Address) -> bool {
        self.actions.iter().any(|entry| &entry.identity == identity)
    }

    /// Most advanced phase among `identity`'s in-flight actions
    #[must_use]
    pub fn phase(&self, identity: &Address) -> RewardPhase {
        self.actions
            .iter()
            .filter(|entry| &entry.identity == identity)
            .map(|entry| entry.phase)
            .max()
            .unwrap_or(RewardPhase::Idle)
    }

    /// Number of in-flight actions for `identity`
    #[must_use]
    pub fn in_flight(&self, identity: &Address) -> usize {
        self.actions.iter().filter(|entry| &entry.identity == identity).count()
    }

    fn advance(&self, id: ActionId, to: RewardPhase) -> Result<(), PhaseError> {
        let mut entry = self
            .actions
            .get_mut(&id)
            .ok_or_else(|| PhaseError::UnknownAction(id.to_string()))?;
        validate_transition(entry.phase, to)?;
        tracing::debug!(action_id = %id, label = entry.label, from = ?entry.phase, to = ?to, "action phase");
        entry.phase = to;
        Ok(())
    }

    fn finish(&self, id: ActionId) {
        if let Some((_, action)) = self.actions.remove(&id) {
            if let Err(e) = validate_transition(action.phase, RewardPhase::Idle) {
                tracing::warn!(action_id = %id, error = %e, "action finished from unexpected phase");
            }
        }
    }
}

/// Handle on one tracked action
#[derive(Debug)]
pub struct ActionGuard<'a> {
    tracker: &'a ActionTracker,
    id: ActionId,
}

impl ActionGuard<'_> {
    /// Tracked action id
    #[inline]
    #[must_use]
    pub fn id(&self) -> ActionId {
        self.id
    }

    /// Move the action to `to`
    ///
    /// # Errors
    /// Returns [`PhaseError`] if the transition is not allowed
    pub fn advance(&self, to: RewardPhase) -> Result<(), PhaseError> {
        self.tracker.advance(self.id, to)
    }
}

impl Drop for ActionGuard<'_> {
    fn drop(&mut self) {
        self.tracker.finish(self.id);
    }
}
