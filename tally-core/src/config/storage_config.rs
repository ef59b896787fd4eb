//! Storage configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ACTOR_COLUMN, DEFAULT_KEY_COLUMN, DEFAULT_MAX_SQL_PARAMS, DEFAULT_TABLE,
    DEFAULT_VALUE_COLUMN,
};

/// Configuration for vote storage backends.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    /// Upper bound on bound parameters per statement. Default: 999.
    pub max_sql_params: Option<usize>,
    /// Run the advisory consistency check when `store_batch` receives a
    /// caller-supplied previous state. Default: on in debug builds.
    pub check_consistency: Option<bool>,
    /// Vote table name. Default: "votes".
    pub table: Option<String>,
    /// Key column name. Default: "key_id".
    pub key_column: Option<String>,
    /// Actor column name. Default: "actor_id".
    pub actor_column: Option<String>,
    /// Vote value column name. Default: "value".
    pub value_column: Option<String>,
}

impl StorageConfig {
    pub fn effective_max_sql_params(&self) -> usize {
        self.max_sql_params.unwrap_or(DEFAULT_MAX_SQL_PARAMS)
    }

    pub fn effective_check_consistency(&self) -> bool {
        self.check_consistency.unwrap_or(cfg!(debug_assertions))
    }

    pub fn effective_table(&self) -> &str {
        self.table.as_deref().unwrap_or(DEFAULT_TABLE)
    }

    pub fn effective_key_column(&self) -> &str {
        self.key_column.as_deref().unwrap_or(DEFAULT_KEY_COLUMN)
    }

    pub fn effective_actor_column(&self) -> &str {
        self.actor_column.as_deref().unwrap_or(DEFAULT_ACTOR_COLUMN)
    }

    pub fn effective_value_column(&self) -> &str {
        self.value_column.as_deref().unwrap_or(DEFAULT_VALUE_COLUMN)
    }
}

/// Plain SQL identifier: ASCII letter or `_`, then letters, digits or `_`.
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
