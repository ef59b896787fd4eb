//! Connection settings for the vote database.

use rusqlite::Connection;
use tally_core::errors::StorageError;

use crate::to_storage_err;

/// Writer settings. Readers of a file database rely on the WAL journal.
pub fn apply_pragmas(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA cache_size = -16000;
         PRAGMA busy_timeout = 5000;",
    )
    .map_err(to_storage_err)
}

/// Reader settings. Journal mode is owned by the writer.
pub fn apply_read_pragmas(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch("PRAGMA cache_size = -16000; PRAGMA busy_timeout = 5000;")
        .map_err(to_storage_err)
}

/// In-memory databases report `memory` and return false.
pub fn verify_wal_mode(conn: &Connection) -> Result<bool, StorageError> {
    let mode: String = conn
        .pragma_query_value(None, "journal_mode", |row| row.get(0))
        .map_err(to_storage_err)?;
    Ok(mode.eq_ignore_ascii_case("wal"))
}
