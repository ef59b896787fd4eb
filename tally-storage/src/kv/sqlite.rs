//! Key-value engine on the `kv_votes` table.

use rusqlite::{params, params_from_iter, OptionalExtension};
use tally_core::errors::StorageError;
use tally_core::models::Key;

use super::{KeyValueDb, KvWrite};
use crate::connection::writer::with_immediate_transaction;
use crate::connection::DatabaseManager;
use crate::queries::placeholders;
use crate::to_storage_err;

#[derive(Debug)]
pub struct SqliteKvDb {
    name: String,
    db: DatabaseManager,
    max_sql_params: usize,
}

impl SqliteKvDb {
    pub fn new(name: impl Into<String>, db: DatabaseManager, max_sql_params: usize) -> Self {
        Self {
            name: name.into(),
            db,
            max_sql_params: max_sql_params.max(1),
        }
    }

    pub fn db(&self) -> &DatabaseManager {
        &self.db
    }
}

impl KeyValueDb for SqliteKvDb {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: Key) -> Result<Option<Vec<u8>>, StorageError> {
        self.db.with_reader(|conn| {
            conn.prepare_cached("SELECT value FROM kv_votes WHERE key = ?1")
                .and_then(|mut stmt| stmt.query_row(params![key], |row| row.get(0)).optional())
                .map_err(to_storage_err)
        })
    }

    fn get_many(&self, keys: &[Key]) -> Result<Vec<(Key, Vec<u8>)>, StorageError> {
        self.db.with_reader(|conn| {
            let mut found = Vec::with_capacity(keys.len());
            for chunk in keys.chunks(self.max_sql_params) {
                let sql = format!(
                    "SELECT key, value FROM kv_votes WHERE key IN ({})",
                    placeholders(chunk.len())
                );
                let mut stmt = conn.prepare_cached(&sql).map_err(to_storage_err)?;
                let rows = stmt
                    .query_map(params_from_iter(chunk), |row| Ok((row.get(0)?, row.get(1)?)))
                    .map_err(to_storage_err)?;
                for row in rows {
                    found.push(row.map_err(to_storage_err)?);
                }
            }
            Ok(found)
        })
    }

    fn scan(&self) -> Result<Vec<(Key, Vec<u8>)>, StorageError> {
        self.db.with_reader(|conn| {
            let mut stmt = conn
                .prepare_cached("SELECT key, value FROM kv_votes ORDER BY key")
                .map_err(to_storage_err)?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
                .map_err(to_storage_err)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(to_storage_err)
        })
    }

    fn write_batch(&self, ops: &[KvWrite]) -> Result<(), StorageError> {
        self.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| {
                for op in ops {
                    match op {
                        KvWrite::Put { key, value } => tx
                            .prepare_cached(
                                "INSERT INTO kv_votes (key, value) VALUES (?1, ?2)
                                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                            )
                            .and_then(|mut stmt| stmt.execute(params![key, value]))
                            .map_err(to_storage_err)?,
                        KvWrite::Remove { key } => tx
                            .prepare_cached("DELETE FROM kv_votes WHERE key = ?1")
                            .and_then(|mut stmt| stmt.execute(params![key]))
                            .map_err(to_storage_err)?,
                    };
                }
                Ok(())
            })
        })
    }
}
