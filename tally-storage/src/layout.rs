//! Table and column names of a three-column vote table.

use tally_core::config::{is_sql_identifier, StorageConfig};
use tally_core::constants::{
    DEFAULT_ACTOR_COLUMN, DEFAULT_KEY_COLUMN, DEFAULT_TABLE, DEFAULT_VALUE_COLUMN,
};
use tally_core::errors::StorageError;

/// Validated names of a `(key, actor, value)` table.
///
/// Names are interpolated into SQL text, so construction rejects anything
/// that is not a plain identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    table: String,
    key_column: String,
    actor_column: String,
    value_column: String,
}

impl TableLayout {
    pub fn new(
        table: &str,
        key_column: &str,
        actor_column: &str,
        value_column: &str,
    ) -> Result<Self, StorageError> {
        for name in [table, key_column, actor_column, value_column] {
            if !is_sql_identifier(name) {
                return Err(StorageError::InvalidIdentifier {
                    name: name.to_string(),
                });
            }
        }
        Ok(Self {
            table: table.to_string(),
            key_column: key_column.to_string(),
            actor_column: actor_column.to_string(),
            value_column: value_column.to_string(),
        })
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        Self::new(
            config.effective_table(),
            config.effective_key_column(),
            config.effective_actor_column(),
            config.effective_value_column(),
        )
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    pub fn actor_column(&self) -> &str {
        &self.actor_column
    }

    pub fn value_column(&self) -> &str {
        &self.value_column
    }

    /// True for the layout created by the schema migrations.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub(crate) fn create_table_sql(&self) -> String {
        let Self {
            table,
            key_column: key,
            actor_column: actor,
            value_column: value,
        } = self;
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                {key}   INTEGER NOT NULL,
                {actor} INTEGER NOT NULL,
                {value} INTEGER NOT NULL,
                PRIMARY KEY ({key}, {actor})
            ) STRICT;
            CREATE INDEX IF NOT EXISTS idx_{table}_{actor} ON {table}({actor});"
        )
    }
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            key_column: DEFAULT_KEY_COLUMN.to_string(),
            actor_column: DEFAULT_ACTOR_COLUMN.to_string(),
            value_column: DEFAULT_VALUE_COLUMN.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_config_defaults() {
        let layout = TableLayout::from_config(&StorageConfig::default()).unwrap();
        assert!(layout.is_default());
        assert_eq!(layout.table(), "votes");
    }

    #[test]
    fn rejects_injection() {
        let err = TableLayout::new("votes", "key_id", "actor_id); --", "value").unwrap_err();
        assert!(matches!(err, StorageError::InvalidIdentifier { name } if name == "actor_id); --"));
    }

    #[test]
    fn custom_table_sql_uses_names() {
        let layout = TableLayout::new("post_rates", "post_id", "user_id", "rate").unwrap();
        assert!(!layout.is_default());
        let sql = layout.create_table_sql();
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS post_rates"));
        assert!(sql.contains("PRIMARY KEY (post_id, user_id)"));
    }
}
