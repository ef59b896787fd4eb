//! Key-value vote storage: one serialized actor set per key.

pub mod memory;
pub mod sqlite;
pub mod storage;

pub use memory::MemoryKvDb;
pub use sqlite::SqliteKvDb;
pub use storage::KvVotingStorage;

use tally_core::errors::StorageError;
use tally_core::models::Key;

/// One operation of an atomic write batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvWrite {
    Put { key: Key, value: Vec<u8> },
    Remove { key: Key },
}

impl KvWrite {
    pub fn key(&self) -> Key {
        match self {
            Self::Put { key, .. } | Self::Remove { key } => *key,
        }
    }
}

/// Minimal key-value engine: point reads, full scan, atomic batches.
pub trait KeyValueDb: Send + Sync {
    /// Engine name, used as the store identity.
    fn name(&self) -> &str;

    fn get(&self, key: Key) -> Result<Option<Vec<u8>>, StorageError>;

    /// Values of the present keys among `keys`.
    fn get_many(&self, keys: &[Key]) -> Result<Vec<(Key, Vec<u8>)>, StorageError> {
        let mut found = Vec::with_capacity(keys.len());
        for &key in keys {
            if let Some(value) = self.get(key)? {
                found.push((key, value));
            }
        }
        Ok(found)
    }

    fn scan(&self) -> Result<Vec<(Key, Vec<u8>)>, StorageError>;

    /// Apply all operations or none.
    fn write_batch(&self, ops: &[KvWrite]) -> Result<(), StorageError>;
}
