//! Contract event schema and reward extraction
//!
//! Receipts carry raw logs. They are decoded against the known event
//! schema and then searched for the event emitted for the caller. A
//! missing event is reported as [`RewardExtraction::NotFound`], which is
//! never conflated with a zero reward.

use crate::error::DecodeError;
use quest_types::Address;
use serde::{Deserialize, Serialize};

/// An undecoded log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLog {
    /// Event name
    pub event: String,
    /// Event arguments
    pub data: serde_json::Value,
}

/// Token amounts travel as decimal strings so `u128` never overflows JSON numbers
mod amount {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(u64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(s) => s.parse().map_err(de::Error::custom),
            Repr::Number(n) => Ok(u128::from(n)),
        }
    }
}

/// `TaskCompleted(user, taskId, reward)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCompleted {
    pub user: Address,
    pub task_id: u64,
    #[serde(with = "amount")]
    pub reward: u128,
}

/// `StreakBonus(user, streak, bonus)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakBonus {
    pub user: Address,
    pub streak: u64,
    #[serde(with = "amount")]
    pub bonus: u128,
}

/// `FarcasterShare(user, reward)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarcasterShare {
    pub user: Address,
    #[serde(with = "amount")]
    pub reward: u128,
}

/// `WeeklyGoal(user, goalId, reward)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyGoal {
    pub user: Address,
    pub goal_id: u64,
    #[serde(with = "amount")]
    pub reward: u128,
}

/// A decoded rewards-contract event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    TaskCompleted(TaskCompleted),
    StreakBonus(StreakBonus),
    FarcasterShare(FarcasterShare),
    WeeklyGoal(WeeklyGoal),
}

impl LedgerEvent {
    /// Event name as emitted by the contract
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::TaskCompleted(_) => "TaskCompleted",
            Self::StreakBonus(_) => "StreakBonus",
            Self::FarcasterShare(_) => "FarcasterShare",
            Self::WeeklyGoal(_) => "WeeklyGoal",
        }
    }

    /// Address the event was emitted for
    #[must_use]
    pub fn user(&self) -> &Address {
        match self {
            Self::TaskCompleted(e) => &e.user,
            Self::StreakBonus(e) => &e.user,
            Self::FarcasterShare(e) => &e.user,
            Self::WeeklyGoal(e) => &e.user,
        }
    }

    /// Decode a raw log
    ///
    /// Returns `Ok(None)` for events outside the schema.
    ///
    /// # Errors
    /// Returns [`DecodeError`] if a known event has a malformed payload
    pub fn decode(raw: &RawLog) -> Result<Option<Self>, DecodeError> {
        fn typed<T: serde::de::DeserializeOwned>(raw: &RawLog) -> Result<T, DecodeError> {
            serde_json::from_value(raw.data.clone()).map_err(|source| DecodeError {
                event: raw.event.clone(),
                source,
            })
        }

        let event = match raw.event.as_str() {
            "TaskCompleted" => Self::TaskCompleted(typed(raw)?),
            "StreakBonus" => Self::StreakBonus(typed(raw)?),
            "FarcasterShare" => Self::FarcasterShare(typed(raw)?),
            "WeeklyGoal" => Self::WeeklyGoal(typed(raw)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    /// Encode as a raw log
    ///
    /// # Errors
    /// Returns error if the payload cannot be represented as JSON
    pub fn to_raw(&self) -> Result<RawLog, serde_json::Error> {
        let data = match self {
            Self::TaskCompleted(e) => serde_json::to_value(e)?,
            Self::StreakBonus(e) => serde_json::to_value(e)?,
            Self::FarcasterShare(e) => serde_json::to_value(e)?,
            Self::WeeklyGoal(e) => serde_json::to_value(e)?,
        };
        Ok(RawLog {
            event: self.name().to_string(),
            data,
        })
    }
}

/// Decode every log in a receipt, skipping unknown and malformed entries
#[must_use]
pub fn decode_logs(logs: &[RawLog]) -> Vec<LedgerEvent> {
    logs.iter()
        .filter_map(|raw| match LedgerEvent::decode(raw) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed log");
                None
            }
        })
        .collect()
}

/// Which event carries the reward for an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardEvent {
    TaskCompleted,
    FarcasterShare,
    WeeklyGoal,
}

/// Result of searching a receipt for the caller's reward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardExtraction {
    Found(u128),
    NotFound,
}

impl RewardExtraction {
    /// Amount, if found
    #[inline]
    #[must_use]
    pub fn amount(self) -> Option<u128> {
        match self {
            Self::Found(amount) => Some(amount),
            Self::NotFound => None,
        }
    }
}

/// Find the reward emitted for `user`
#[must_use]
pub fn extract_reward(events: &[LedgerEvent], user: &Address, kind: RewardEvent) -> RewardExtraction {
    events
        .iter()
        .find_map(|event| match (kind, event) {
            (RewardEvent::TaskCompleted, LedgerEvent::TaskCompleted(e)) if &e.user == user => {
                Some(e.reward)
            }
            (RewardEvent::FarcasterShare, LedgerEvent::FarcasterShare(e)) if &e.user == user => {
                Some(e.reward)
            }
            (RewardEvent::WeeklyGoal, LedgerEvent::WeeklyGoal(e)) if &e.user == user => {
                Some(e.reward)
            }
            _ => None,
        })
        .map_or(RewardExtraction::NotFound, RewardExtraction::Found)
}

/// Sum of streak bonuses credited to `user`
#[must_use]
pub fn streak_bonus(events: &[LedgerEvent], user: &Address) -> u128 {
    events
        .iter()
        .filter_map(|event| match event {
            LedgerEvent::StreakBonus(e) if &e.user == user => Some(e.bonus),
            _ => None,
        })
        .fold(0u128, u128::saturating_add)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn alice() -> Address {
        Address::new([0xa1; 20])
    }

    fn bob() -> Address {
        Address::new([0xb0; 20])
    }

    #[test]
    fn decode_task_completed() {
        let raw = RawLog {
            event: "TaskCompleted".to_string(),
            data: json!({ "user": alice().to_string(), "taskId": 7, "reward": "50" }),
        };
        let event = LedgerEvent::decode(&raw).unwrap().unwrap();
        assert_eq!(
            event,
            LedgerEvent::TaskCompleted(TaskCompleted {
                user: alice(),
                task_id: 7,
                reward: 50
            })
        );
    }

    #[test]
    fn decode_accepts_numeric_amounts() {
        let raw = RawLog {
            event: "FarcasterShare".to_string(),
            data: json!({ "user": alice().to_string(), "reward": 5 }),
        };
        let event = LedgerEvent::decode(&raw).unwrap().unwrap();
        assert!(matches!(event, LedgerEvent::FarcasterShare(FarcasterShare { reward: 5, .. })));
    }

    #[test]
    fn unknown_events_are_skipped() {
        let raw = RawLog {
            event: "Transfer".to_string(),
            data: json!({}),
        };
        assert!(LedgerEvent::decode(&raw).unwrap().is_none());
    }

    #[test]
    fn malformed_known_event_is_an_error() {
        let raw = RawLog {
            event: "WeeklyGoal".to_string(),
            data: json!({ "user": "not-an-address" }),
        };
        let err = LedgerEvent::decode(&raw).unwrap_err();
        assert_eq!(err.event, "WeeklyGoal");
        assert!(decode_logs(&[raw]).is_empty());
    }

    #[test]
    fn raw_roundtrip_preserves_large_amounts() {
        let event = LedgerEvent::WeeklyGoal(WeeklyGoal {
            user: alice(),
            goal_id: 3,
            reward: u128::from(u64::MAX) * 4,
        });
        let raw = event.to_raw().unwrap();
        assert_eq!(raw.event, "WeeklyGoal");
        assert_eq!(LedgerEvent::decode(&raw).unwrap(), Some(event));
    }

    #[test]
    fn extract_matches_caller_only() {
        let events = vec![
            LedgerEvent::TaskCompleted(TaskCompleted {
                user: bob(),
                task_id: 1,
                reward: 10,
            }),
            LedgerEvent::TaskCompleted(TaskCompleted {
                user: alice(),
                task_id: 7,
                reward: 50,
            }),
        ];
        assert_eq!(
            extract_reward(&events, &alice(), RewardEvent::TaskCompleted),
            RewardExtraction::Found(50)
        );
        assert_eq!(
            extract_reward(&events, &alice(), RewardEvent::WeeklyGoal),
            RewardExtraction::NotFound
        );
    }

    #[test]
    fn zero_reward_is_found_not_missing() {
        let events = vec![LedgerEvent::FarcasterShare(FarcasterShare {
            user: alice(),
            reward: 0,
        })];
        let extraction = extract_reward(&events, &alice(), RewardEvent::FarcasterShare);
        assert_eq!(extraction, RewardExtraction::Found(0));
        assert_eq!(extraction.amount(), Some(0));
        assert_eq!(RewardExtraction::NotFound.amount(), None);
    }

    #[test]
    fn streak_bonus_sums_for_caller() {
        let events = vec![
            LedgerEvent::StreakBonus(StreakBonus {
                user: alice(),
                streak: 7,
                bonus: 20,
            }),
            LedgerEvent::StreakBonus(StreakBonus {
                user: bob(),
                streak: 7,
                bonus: 20,
            }),
        ];
        assert_eq!(streak_bonus(&events, &alice()), 20);
        assert_eq!(streak_bonus(&[], &alice()), 0);
    }
}
