//! Tracing subscriber setup

use crate::config::LoggingConfig;
use crate::error::QuestError;
use tracing_subscriber::EnvFilter;

/// Filter from `RUST_LOG`, else the configured directive
///
/// # Errors
/// Returns [`QuestError::Telemetry`] if the configured directive is invalid
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, QuestError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.filter)
            .map_err(|e| QuestError::Telemetry(format!("invalid filter {:?}: {e}", config.filter))),
    }
}

/// Install the global subscriber
///
/// # Errors
/// Returns [`QuestError::Telemetry`] if the filter is invalid or a global
/// subscriber is already installed
pub fn init_tracing(config: &LoggingConfig) -> Result<(), QuestError> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| QuestError::Telemetry(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_directive_is_rejected() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LoggingConfig {
            filter: "quest_core=notalevel".to_string(),
            json: false,
        };
        assert!(matches!(env_filter(&config), Err(QuestError::Telemetry(_))));
    }

    #[test]
    fn second_install_fails() {
        let config = LoggingConfig::default();
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
