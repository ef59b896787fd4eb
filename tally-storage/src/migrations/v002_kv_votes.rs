//! v002: kv_votes, one serialized actor set per key.

use rusqlite::Connection;
use tally_core::errors::StorageError;

pub fn migrate(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS kv_votes (
            key   INTEGER PRIMARY KEY,
            value BLOB NOT NULL
        ) STRICT;
        ",
    )
    .map_err(|e| StorageError::MigrationFailed {
        version: 2,
        reason: e.to_string(),
    })
}
