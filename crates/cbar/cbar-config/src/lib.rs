//! Host-side configuration for the `cbar-demo` binary.
//!
//! This does not configure the crossbar engine itself — `cbar-core` has no
//! file/env/CLI surface by design — it configures the *demo harness* that
//! wires a sample line table together and drives it: how often to tick,
//! how verbose to log, and the handful of thresholds that make the sample
//! table's behavior visible. Shaped after `onyx-config`/`obsidian-config`'s
//! split between engine and host config.

use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize, Debug)]
pub struct DemoConfig {
    #[serde(default = "defaults::tick_interval_ms")]
    pub tick_interval_ms: u64,

    #[serde(default = "defaults::log_level")]
    pub log_level: String,

    #[serde(default = "defaults::voltage_threshold_up")]
    pub voltage_threshold_up: i64,

    #[serde(default = "defaults::voltage_threshold_down")]
    pub voltage_threshold_down: i64,

    #[serde(default = "defaults::ignition_timeout_up_ms")]
    pub ignition_timeout_up_ms: i64,

    #[serde(default = "defaults::ignition_timeout_down_ms")]
    pub ignition_timeout_down_ms: i64,

    #[serde(default = "defaults::heartbeat_period_ms")]
    pub heartbeat_period_ms: i64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: defaults::tick_interval_ms(),
            log_level: defaults::log_level(),
            voltage_threshold_up: defaults::voltage_threshold_up(),
            voltage_threshold_down: defaults::voltage_threshold_down(),
            ignition_timeout_up_ms: defaults::ignition_timeout_up_ms(),
            ignition_timeout_down_ms: defaults::ignition_timeout_down_ms(),
            heartbeat_period_ms: defaults::heartbeat_period_ms(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
}

mod defaults {
    pub fn tick_interval_ms() -> u64 {
        100
    }

    pub fn log_level() -> String {
        "info".into()
    }

    pub fn voltage_threshold_up() -> i64 {
        1050
    }

    pub fn voltage_threshold_down() -> i64 {
        950
    }

    pub fn ignition_timeout_up_ms() -> i64 {
        0
    }

    pub fn ignition_timeout_down_ms() -> i64 {
        1000
    }

    pub fn heartbeat_period_ms() -> i64 {
        1000
    }
}

impl DemoConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config: DemoConfig = toml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in_missing_fields() {
        let config: DemoConfig = toml::from_str("").unwrap();
        assert_eq!(config.tick_interval_ms, 100);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.voltage_threshold_up, 1050);
    }

    #[test]
    fn explicit_fields_override_defaults() {
        let config: DemoConfig = toml::from_str(
            r#"
            tick_interval_ms = 50
            log_level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.tick_interval_ms, 50);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.voltage_threshold_down, 950);
    }

    #[test]
    fn load_reports_read_error_for_missing_file() {
        let err = DemoConfig::load("/nonexistent/cbar-demo.toml".to_string()).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
