//! v001: votes table in the default layout.

use rusqlite::Connection;
use tally_core::errors::StorageError;

use crate::layout::TableLayout;

pub fn migrate(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(&TableLayout::default().create_table_sql())
        .map_err(|e| StorageError::MigrationFailed {
            version: 1,
            reason: e.to_string(),
        })
}
