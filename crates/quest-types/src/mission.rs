//! Ledger-tracked missions

use crate::stats::LocalSnapshot;
use serde::{Deserialize, Serialize};

/// Which local counter approximates a mission when the ledger is silent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionCounter {
    #[default]
    Tasks,
    Goals,
    Streak,
}

impl MissionCounter {
    /// Read the counter from a local snapshot
    #[inline]
    #[must_use]
    pub fn read(self, local: &LocalSnapshot) -> u64 {
        match self {
            Self::Tasks => local.tasks_completed,
            Self::Goals => local.weekly_goals,
            Self::Streak => local.streak,
        }
    }
}

/// A configured mission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionDefinition {
    pub mission_id: u64,
    pub target: u64,
    #[serde(default)]
    pub counter: MissionCounter,
}

impl MissionDefinition {
    /// Create a tasks-driven mission
    #[must_use]
    pub fn new(mission_id: u64, target: u64) -> Self {
        Self {
            mission_id,
            target,
            counter: MissionCounter::Tasks,
        }
    }

    /// With fallback counter
    #[inline]
    #[must_use]
    pub fn with_counter(mut self, counter: MissionCounter) -> Self {
        self.counter = counter;
        self
    }

    /// Best-effort progress from local data: the counter modulo `target`
    #[must_use]
    pub fn approximate_progress(&self, local: &LocalSnapshot) -> u64 {
        if self.target == 0 {
            return 0;
        }
        self.counter.read(local) % self.target
    }
}

/// Where a mission's progress value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressSource {
    Ledger,
    LocalApproximation,
}

/// Mission progress as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    pub mission_id: u64,
    pub target: u64,
    pub progress: u64,
    pub source: ProgressSource,
}

impl Mission {
    /// Whether progress has reached the target
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.target > 0 && self.progress >= self.target
    }
}
