//! Top-level configuration with layered resolution.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{is_sql_identifier, CounterConfig, StorageConfig};
use crate::constants::VOTE_ROW_COLUMNS;
use crate::errors::ConfigError;

/// Project config file looked up by [`TallyConfig::load`].
pub const CONFIG_FILE_NAME: &str = "tally.toml";

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. Environment variables (`TALLY_*`)
/// 2. Project config (`tally.toml` in the given root)
/// 3. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct TallyConfig {
    pub storage: StorageConfig,
    pub counter: CounterConfig,
}

impl TallyConfig {
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let project_config_path = root.join(CONFIG_FILE_NAME);
        if project_config_path.exists() {
            Self::merge_toml_file(&mut config, &project_config_path)?;
        }

        Self::apply_env_overrides(&mut config);
        Self::validate(&config)?;

        tracing::debug!(root = %root.display(), "tally config resolved");
        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        Self::validate(&config)?;
        Ok(config)
    }

    pub fn validate(config: &TallyConfig) -> Result<(), ConfigError> {
        if let Some(max) = config.storage.max_sql_params {
            if max < VOTE_ROW_COLUMNS {
                return Err(ConfigError::ValidationFailed {
                    field: "storage.max_sql_params".to_string(),
                    message: format!("must be at least {VOTE_ROW_COLUMNS}"),
                });
            }
        }
        for (field, value) in [
            ("storage.table", &config.storage.table),
            ("storage.key_column", &config.storage.key_column),
            ("storage.actor_column", &config.storage.actor_column),
            ("storage.value_column", &config.storage.value_column),
        ] {
            if let Some(name) = value {
                if !is_sql_identifier(name) {
                    return Err(ConfigError::ValidationFailed {
                        field: field.to_string(),
                        message: format!("{name:?} is not a plain SQL identifier"),
                    });
                }
            }
        }
        if config.counter.initial_capacity == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "counter.initial_capacity".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Unknown keys are ignored.
    fn merge_toml_file(config: &mut TallyConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let file_config: TallyConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::merge(config, &file_config);
        Ok(())
    }

    /// Values in `other` override `base` only when set.
    fn merge(base: &mut TallyConfig, other: &TallyConfig) {
        if other.storage.max_sql_params.is_some() {
            base.storage.max_sql_params = other.storage.max_sql_params;
        }
        if other.storage.check_consistency.is_some() {
            base.storage.check_consistency = other.storage.check_consistency;
        }
        if other.storage.table.is_some() {
            base.storage.table = other.storage.table.clone();
        }
        if other.storage.key_column.is_some() {
            base.storage.key_column = other.storage.key_column.clone();
        }
        if other.storage.actor_column.is_some() {
            base.storage.actor_column = other.storage.actor_column.clone();
        }
        if other.storage.value_column.is_some() {
            base.storage.value_column = other.storage.value_column.clone();
        }
        if other.counter.initial_capacity.is_some() {
            base.counter.initial_capacity = other.counter.initial_capacity;
        }
    }

    /// Pattern: `TALLY_MAX_SQL_PARAMS`, `TALLY_CHECK_CONSISTENCY`, `TALLY_TABLE`.
    fn apply_env_overrides(config: &mut TallyConfig) {
        if let Ok(val) = std::env::var("TALLY_MAX_SQL_PARAMS") {
            if let Ok(v) = val.parse::<usize>() {
                config.storage.max_sql_params = Some(v);
            }
        }
        if let Ok(val) = std::env::var("TALLY_CHECK_CONSISTENCY") {
            if let Ok(v) = val.parse::<bool>() {
                config.storage.check_consistency = Some(v);
            }
        }
        if let Ok(val) = std::env::var("TALLY_TABLE") {
            config.storage.table = Some(val);
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }
}
