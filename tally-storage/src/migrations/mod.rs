//! Schema migrations tracked through `PRAGMA user_version`.

pub mod v001_votes;
pub mod v002_kv_votes;

use rusqlite::Connection;
use tally_core::errors::StorageError;

use crate::connection::writer::with_immediate_transaction;

type MigrateFn = fn(&Connection) -> Result<(), StorageError>;

const MIGRATIONS: &[(u32, MigrateFn)] = &[
    (1, v001_votes::migrate),
    (2, v002_kv_votes::migrate),
];

/// Highest schema version known to this build.
pub const LATEST_VERSION: u32 = 2;

/// Current schema version of the database.
pub fn current_version(conn: &Connection) -> Result<u32, StorageError> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| StorageError::MigrationFailed {
            version: 0,
            reason: e.to_string(),
        })
}

/// Apply every migration newer than the database's version, each in its
/// own transaction together with the version bump.
pub fn run_migrations(conn: &Connection) -> Result<u32, StorageError> {
    let mut version = current_version(conn)?;
    if version > LATEST_VERSION {
        return Err(StorageError::MigrationFailed {
            version,
            reason: format!("database is newer than supported version {LATEST_VERSION}"),
        });
    }

    let start = version;
    for &(target, migrate) in MIGRATIONS.iter().filter(|(v, _)| *v > start) {
        with_immediate_transaction(conn, |tx| {
            migrate(tx)?;
            tx.pragma_update(None, "user_version", target)
                .map_err(|e| StorageError::MigrationFailed {
                    version: target,
                    reason: e.to_string(),
                })
        })?;
        tracing::info!(version = target, "applied vote schema migration");
        version = target;
    }
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(run_migrations(&conn).unwrap(), LATEST_VERSION);
        assert_eq!(run_migrations(&conn).unwrap(), LATEST_VERSION);
        assert_eq!(current_version(&conn).unwrap(), LATEST_VERSION);
    }

    #[test]
    fn partially_migrated_database_is_brought_up_to_date() {
        let conn = Connection::open_in_memory().unwrap();
        with_immediate_transaction(&conn, |tx| {
            v001_votes::migrate(tx)?;
            tx.pragma_update(None, "user_version", 1)
                .map_err(|e| StorageError::query(e.to_string()))
        })
        .unwrap();

        assert_eq!(run_migrations(&conn).unwrap(), LATEST_VERSION);
        let kv_tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'kv_votes'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(kv_tables, 1);
    }

    #[test]
    fn newer_database_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", LATEST_VERSION + 1)
            .unwrap();
        assert!(matches!(
            run_migrations(&conn),
            Err(StorageError::MigrationFailed { .. })
        ));
    }
}
