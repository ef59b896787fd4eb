//! KvVotingStorage: `VotingStorage` over any [`KeyValueDb`].

use tally_core::config::StorageConfig;
use tally_core::errors::StorageError;
use tally_core::models::{ActorSet, Key, StoreId, VoteMap};
use tally_core::traits::VotingStorage;

use super::{KeyValueDb, KvWrite};
use crate::consistency::check_storage_consistency;
use crate::diff::VoteDiff;

/// Each key maps to its whole actor set, serialized as a sorted JSON list
/// of signed tokens. Keys whose set becomes empty are removed.
pub struct KvVotingStorage<D: KeyValueDb> {
    db: D,
    store_id: StoreId,
    check_consistency: bool,
}

impl<D: KeyValueDb> KvVotingStorage<D> {
    pub fn new(db: D, config: &StorageConfig) -> Self {
        Self {
            store_id: StoreId::key_value(db.name()),
            db,
            check_consistency: config.effective_check_consistency(),
        }
    }

    pub fn db(&self) -> &D {
        &self.db
    }

    fn decode(key: Key, bytes: &[u8]) -> Result<ActorSet, StorageError> {
        serde_json::from_slice(bytes).map_err(|e| {
            StorageError::corruption(format!("undecodable actor set for key {key}: {e}"))
        })
    }

    fn decode_all(entries: Vec<(Key, Vec<u8>)>) -> Result<VoteMap, StorageError> {
        let mut map = VoteMap::default();
        for (key, bytes) in entries {
            let set = Self::decode(key, &bytes)?;
            if !set.is_empty() {
                map.insert(key, set);
            }
        }
        Ok(map)
    }

    fn write_op(key: Key, set: Option<&ActorSet>) -> Result<KvWrite, StorageError> {
        match set.filter(|set| !set.is_empty()) {
            Some(set) => {
                let value = serde_json::to_vec(set).map_err(|e| StorageError::query(e.to_string()))?;
                Ok(KvWrite::Put { key, value })
            }
            None => Ok(KvWrite::Remove { key }),
        }
    }

    /// One single-operation batch per key of `current`.
    fn store_ultra_safe(&self, current: &VoteMap) -> Result<(), StorageError> {
        for (&key, set) in current {
            self.db.write_batch(&[Self::write_op(key, Some(set))?])?;
        }
        Ok(())
    }
}

impl<D: KeyValueDb> VotingStorage for KvVotingStorage<D> {
    fn storage_id(&self) -> &StoreId {
        &self.store_id
    }

    fn load(&self, key: Key) -> Result<ActorSet, StorageError> {
        match self.db.get(key)? {
            Some(bytes) => Self::decode(key, &bytes),
            None => Ok(ActorSet::new()),
        }
    }

    fn load_batch(&self, keys: &[Key]) -> Result<VoteMap, StorageError> {
        if keys.is_empty() {
            return Ok(VoteMap::default());
        }
        Self::decode_all(self.db.get_many(keys)?)
    }

    fn load_all(&self) -> Result<VoteMap, StorageError> {
        Self::decode_all(self.db.scan()?)
    }

    fn store_batch(&self, current: &VoteMap, previous: Option<&VoteMap>) -> Result<(), StorageError> {
        let _span = tracing::info_span!("tally.store_batch", store = %self.store_id, keys = current.len())
            .entered();

        let loaded;
        let previous = match previous {
            Some(previous) => {
                if self.check_consistency {
                    if let Err(e) = check_storage_consistency(self, current, previous) {
                        tracing::warn!(store = %self.store_id, error = %e, "consistency check failed to run");
                    }
                }
                previous
            }
            None => {
                let keys: Vec<Key> = current.keys().copied().collect();
                loaded = self.load_batch(&keys)?;
                &loaded
            }
        };

        let diff = VoteDiff::compute(current, previous);
        tracing::debug!(
            store = %self.store_id,
            changed_keys = diff.changed_keys().len(),
            rows = diff.len(),
            "vote diff computed"
        );
        if diff.is_empty() {
            return Ok(());
        }

        let mut changed: Vec<Key> = diff.changed_keys().into_iter().collect();
        changed.sort_unstable();
        let ops = changed
            .into_iter()
            .map(|key| Self::write_op(key, current.get(&key)))
            .collect::<Result<Vec<_>, _>>()?;

        match self.db.write_batch(&ops) {
            Ok(()) => Ok(()),
            Err(e) if e.is_query_error() => {
                tracing::error!(
                    store = %self.store_id,
                    error = %e,
                    "batched vote store failed, falling back to per-key writes"
                );
                self.store_ultra_safe(current)
            }
            Err(e) => Err(e),
        }
    }
}

impl<D: KeyValueDb + std::fmt::Debug> std::fmt::Debug for KvVotingStorage<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvVotingStorage")
            .field("store_id", &self.store_id)
            .field("db", &self.db)
            .finish()
    }
}
