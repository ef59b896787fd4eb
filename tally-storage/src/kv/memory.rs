//! In-process key-value engine.

use std::collections::BTreeMap;
use std::sync::RwLock;

use tally_core::errors::StorageError;
use tally_core::models::Key;

use super::{KeyValueDb, KvWrite};

#[derive(Debug, Default)]
pub struct MemoryKvDb {
    name: String,
    entries: RwLock<BTreeMap<Key, Vec<u8>>>,
}

impl MemoryKvDb {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueDb for MemoryKvDb {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: Key) -> Result<Option<Vec<u8>>, StorageError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StorageError::unavailable("kv read lock poisoned"))?;
        Ok(entries.get(&key).cloned())
    }

    fn scan(&self) -> Result<Vec<(Key, Vec<u8>)>, StorageError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StorageError::unavailable("kv read lock poisoned"))?;
        Ok(entries.iter().map(|(k, v)| (*k, v.clone())).collect())
    }

    fn write_batch(&self, ops: &[KvWrite]) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::unavailable("kv write lock poisoned"))?;
        for op in ops {
            match op {
                KvWrite::Put { key, value } => {
                    entries.insert(*key, value.clone());
                }
                KvWrite::Remove { key } => {
                    entries.remove(key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_puts_and_removes() {
        let db = MemoryKvDb::new("votes");
        db.write_batch(&[
            KvWrite::Put { key: 1, value: b"[1]".to_vec() },
            KvWrite::Put { key: 2, value: b"[2]".to_vec() },
        ])
        .unwrap();
        db.write_batch(&[KvWrite::Remove { key: 1 }]).unwrap();

        assert_eq!(db.len(), 1);
        assert_eq!(db.get(1).unwrap(), None);
        assert_eq!(db.get(2).unwrap(), Some(b"[2]".to_vec()));
        assert_eq!(db.get_many(&[1, 2, 3]).unwrap(), vec![(2, b"[2]".to_vec())]);
    }
}
