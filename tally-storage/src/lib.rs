//! # tally-storage
//!
//! Persistence of per-key actor sets. The diff engine computes the minimal
//! row changes between two vote maps; the table backend applies them to a
//! three-column SQLite table and the key-value backend to serialized sets.

pub mod connection;
pub mod consistency;
pub mod diff;
pub mod kv;
pub mod layout;
pub mod migrations;
pub mod queries;
pub mod table;

pub use connection::DatabaseManager;
pub use consistency::{check_storage_consistency, ConsistencyReport, KeyMismatch};
pub use diff::{VoteDiff, VoteRow};
pub use kv::{KeyValueDb, KvVotingStorage, KvWrite, MemoryKvDb, SqliteKvDb};
pub use layout::TableLayout;
pub use table::TableVotingStorage;

use rusqlite::ErrorCode;
use tally_core::errors::StorageError;

/// Classify a rusqlite error.
///
/// Failures of the connection or the database file itself become
/// `Unavailable`; everything else is a `Query` error, which the batched
/// write paths recover from with per-row writes.
pub(crate) fn to_storage_err(e: rusqlite::Error) -> StorageError {
    let connection_level = match &e {
        rusqlite::Error::SqliteFailure(err, _) => matches!(
            err.code,
            ErrorCode::CannotOpen
                | ErrorCode::NotADatabase
                | ErrorCode::SystemIoFailure
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::DiskFull
                | ErrorCode::PermissionDenied
                | ErrorCode::OutOfMemory
                | ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::FileLockingProtocolFailed
        ),
        rusqlite::Error::InvalidPath(_) => true,
        _ => false,
    };
    if connection_level {
        StorageError::unavailable(e.to_string())
    } else {
        StorageError::query(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_violation_is_a_query_error() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY); INSERT INTO t VALUES (1);")
            .unwrap();
        let err = conn.execute("INSERT INTO t VALUES (1)", []).unwrap_err();
        assert!(to_storage_err(err).is_query_error());
    }

    #[test]
    fn syntax_error_is_a_query_error() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let err = conn.execute_batch("SELEC nothing").unwrap_err();
        assert!(to_storage_err(err).is_query_error());
    }

    #[test]
    fn unopenable_path_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("votes.db");
        let err = rusqlite::Connection::open(&path).unwrap_err();
        assert!(matches!(
            to_storage_err(err),
            StorageError::Unavailable { .. }
        ));
    }
}
