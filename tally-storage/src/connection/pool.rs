//! Read-only connections for vote lookups on file-backed databases.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rusqlite::{Connection, OpenFlags};
use tally_core::errors::StorageError;

use super::pragmas::apply_read_pragmas;
use crate::to_storage_err;

/// Readers opened per file-backed [`super::DatabaseManager`].
pub const DEFAULT_READERS: usize = 4;
const MAX_READERS: usize = 8;

/// Fixed set of read-only connections handed out in turn.
pub struct ReadPool {
    readers: Vec<Mutex<Connection>>,
    cursor: AtomicUsize,
}

impl ReadPool {
    /// Open `count` readers on `path`, clamped to `1..=8`.
    pub fn open(path: &Path, count: usize) -> Result<Self, StorageError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let readers = (0..count.clamp(1, MAX_READERS))
            .map(|_| {
                let conn = Connection::open_with_flags(path, flags).map_err(to_storage_err)?;
                apply_read_pragmas(&conn)?;
                Ok(Mutex::new(conn))
            })
            .collect::<Result<Vec<_>, StorageError>>()?;
        Ok(Self {
            readers,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Run `f` on the next reader. A poisoned reader is reported as
    /// unavailable storage.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let slot = self.cursor.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[slot]
            .lock()
            .map_err(|_| StorageError::unavailable("vote reader lock poisoned"))?;
        f(&conn)
    }

    pub fn size(&self) -> usize {
        self.readers.len()
    }
}
