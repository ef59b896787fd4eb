//! Connection management: one serialized writer plus pooled readers.

pub mod pool;
pub mod pragmas;
pub mod writer;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::Connection;
use tally_core::errors::StorageError;

use self::pool::{ReadPool, DEFAULT_READERS};
use self::pragmas::apply_pragmas;
use crate::{migrations, to_storage_err};

/// Owns the write connection and, for file-backed databases, a read pool.
///
/// In-memory databases route reads through the writer, since every
/// in-memory connection is an isolated database.
pub struct DatabaseManager {
    writer: Mutex<Connection>,
    readers: Option<ReadPool>,
    path: Option<PathBuf>,
}

impl DatabaseManager {
    /// Open a database at the given path, apply pragmas, run migrations.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let writer = Connection::open(path).map_err(to_storage_err)?;
        apply_pragmas(&writer)?;
        migrations::run_migrations(&writer)?;

        let readers = ReadPool::open(path, DEFAULT_READERS)?;
        tracing::debug!(path = %path.display(), readers = readers.size(), "vote database opened");

        Ok(Self {
            writer: Mutex::new(writer),
            readers: Some(readers),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory database.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let writer = Connection::open_in_memory().map_err(to_storage_err)?;
        apply_pragmas(&writer)?;
        migrations::run_migrations(&writer)?;

        Ok(Self {
            writer: Mutex::new(writer),
            readers: None,
            path: None,
        })
    }

    /// Execute a write operation with the serialized writer connection.
    pub fn with_writer<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let guard = self
            .writer
            .lock()
            .map_err(|_| StorageError::unavailable("write lock poisoned"))?;
        f(&guard)
    }

    /// Execute a read operation on a pooled reader, or on the writer for
    /// in-memory databases.
    pub fn with_reader<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        match &self.readers {
            Some(readers) => readers.with_conn(f),
            None => self.with_writer(f),
        }
    }

    /// Database file path, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl std::fmt::Debug for DatabaseManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseManager")
            .field("path", &self.path)
            .field("readers", &self.readers.as_ref().map_or(0, ReadPool::size))
            .finish()
    }
}
