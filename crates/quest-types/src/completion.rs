//! Uniform outcome of reward-issuing actions

use crate::address::TxHash;
use serde::{Deserialize, Serialize};

/// How the `reward` of a successful action was determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardSource {
    /// Decoded from the caller's event in the receipt
    Event,
    /// Configured constant mirrored from the contract
    Constant,
    /// The call succeeded but no event for the caller was emitted
    NotFound,
    /// No reward applies (failed action)
    #[default]
    None,
}

/// Outcome of one reward-issuing action
///
/// Errors cross the public boundary as data: `error` carries the
/// underlying message verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
    pub success: bool,
    pub reward: u128,
    /// Streak bonus credited in the same transaction
    #[serde(default)]
    pub bonus: u128,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub reward_source: RewardSource,
}

impl CompletionResult {
    /// Successful action
    #[must_use]
    pub fn rewarded(tx_hash: TxHash, reward: u128, source: RewardSource) -> Self {
        Self {
            success: true,
            reward,
            bonus: 0,
            tx_hash: Some(tx_hash),
            error: None,
            reward_source: source,
        }
    }

    /// Failure before anything was broadcast
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Failure of a broadcast transaction
    #[must_use]
    pub fn failed_with_tx(tx_hash: TxHash, error: impl Into<String>) -> Self {
        Self {
            tx_hash: Some(tx_hash),
            ..Self::failed(error)
        }
    }

    /// With streak bonus
    #[inline]
    #[must_use]
    pub fn with_bonus(mut self, bonus: u128) -> Self {
        self.bonus = bonus;
        self
    }

    /// Reward plus bonus
    #[inline]
    #[must_use]
    pub fn total_reward(&self) -> u128 {
        self.reward.saturating_add(self.bonus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_carries_message_and_no_reward() {
        let result = CompletionResult::failed("User rejected the request.");
        assert!(!result.success);
        assert_eq!(result.reward, 0);
        assert_eq!(result.error.as_deref(), Some("User rejected the request."));
        assert_eq!(result.reward_source, RewardSource::None);
        assert!(result.tx_hash.is_none());
    }

    #[test]
    fn failed_with_tx_keeps_hash() {
        let tx = TxHash::new([1; 32]);
        let result = CompletionResult::failed_with_tx(tx, "execution reverted");
        assert!(!result.success);
        assert_eq!(result.tx_hash, Some(tx));
    }

    #[test]
    fn total_includes_bonus() {
        let result = CompletionResult::rewarded(TxHash::new([2; 32]), 50, RewardSource::Event)
            .with_bonus(20);
        assert_eq!(result.total_reward(), 70);
    }
}
