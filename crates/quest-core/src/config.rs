//! Layer configuration, loaded from TOML

use crate::error::ConfigError;
use quest_ledger::DEFAULT_SHARE_REWARD;
use quest_types::MissionDefinition;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestConfig {
    pub ledger: LedgerConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
    pub cache: CacheConfig,
    pub missions: Vec<MissionDefinition>,
}

impl QuestConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the text is not valid TOML or fails validation
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the file cannot be read, parsed or validated
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), missions = config.missions.len(), "configuration loaded");
        Ok(config)
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] on a zero mission target, a duplicate
    /// mission id, or a zero cache capacity
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for mission in &self.missions {
            if mission.target == 0 {
                return Err(ConfigError::Invalid(format!(
                    "mission {} has a zero target",
                    mission.mission_id
                )));
            }
            if !seen.insert(mission.mission_id) {
                return Err(ConfigError::Invalid(format!(
                    "mission {} is defined twice",
                    mission.mission_id
                )));
            }
        }
        if self.cache.max_identities == 0 {
            return Err(ConfigError::Invalid("cache.max_identities must be positive".to_string()));
        }
        Ok(())
    }

    /// With share reward
    #[inline]
    #[must_use]
    pub fn with_share_reward(mut self, reward: u64) -> Self {
        self.ledger.share_reward = reward;
        self
    }

    /// With store path
    #[inline]
    #[must_use]
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store.path = path.into();
        self
    }

    /// With ledger state path
    #[inline]
    #[must_use]
    pub fn with_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ledger.state_path = path.into();
        self
    }

    /// With an additional mission
    #[inline]
    #[must_use]
    pub fn with_mission(mut self, mission: MissionDefinition) -> Self {
        self.missions.push(mission);
        self
    }
}

/// Ledger settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Share reward used when no `FarcasterShare` event is emitted
    pub share_reward: u64,
    /// Simulated ledger state file used by the CLI
    pub state_path: PathBuf,
}

impl LedgerConfig {
    /// Share reward as a token amount
    #[inline]
    #[must_use]
    pub fn share_reward(&self) -> u128 {
        u128::from(self.share_reward)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            share_reward: u64::try_from(DEFAULT_SHARE_REWARD).unwrap_or(u64::MAX),
            state_path: PathBuf::from(".quest/ledger.json"),
        }
    }
}

/// Local store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory of the file backend
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".quest/store"),
        }
    }
}

/// Tracing settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive, overridden by `RUST_LOG`
    pub filter: String,
    /// Emit JSON lines instead of the human format
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

/// Reconciled-view cache settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_identities: u64,
    pub ttl_secs: u64,
}

impl CacheConfig {
    /// Entry time-to-live
    #[inline]
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_identities: 1024,
            ttl_secs: 3600,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quest_types::MissionCounter;

    #[test]
    fn empty_document_uses_defaults() {
        let config = QuestConfig::from_toml_str("").unwrap();
        assert_eq!(config, QuestConfig::default());
        assert_eq!(config.ledger.share_reward(), 5);
        assert_eq!(config.logging.filter, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn parses_full_document() {
        let text = r#"
            [ledger]
            share_reward = 7
            state_path = "/tmp/ledger.json"

            [store]
            path = "/tmp/store"

            [logging]
            filter = "quest_core=debug"
            json = true

            [cache]
            max_identities = 16
            ttl_secs = 60

            [[missions]]
            mission_id = 1
            target = 10

            [[missions]]
            mission_id = 2
            target = 7
            counter = "streak"
        "#;
        let config = QuestConfig::from_toml_str(text).unwrap();
        assert_eq!(config.ledger.share_reward(), 7);
        assert_eq!(config.store.path, PathBuf::from("/tmp/store"));
        assert!(config.logging.json);
        assert_eq!(config.cache.ttl(), Duration::from_secs(60));
        assert_eq!(config.missions.len(), 2);
        assert_eq!(config.missions[1].counter, MissionCounter::Streak);
    }

    #[test]
    fn rejects_zero_target() {
        let text = "[[missions]]\nmission_id = 1\ntarget = 0\n";
        assert!(matches!(QuestConfig::from_toml_str(text), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_duplicate_missions() {
        let config = QuestConfig::new()
            .with_mission(MissionDefinition::new(3, 5))
            .with_mission(MissionDefinition::new(3, 8));
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_toml() {
        assert!(matches!(
            QuestConfig::from_toml_str("[ledger\nshare_reward = 1"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quest.toml");
        std::fs::write(&path, "[ledger]\nshare_reward = 9\n").unwrap();

        let config = QuestConfig::load(&path).unwrap();
        assert_eq!(config.ledger.share_reward, 9);

        let missing = QuestConfig::load(dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
