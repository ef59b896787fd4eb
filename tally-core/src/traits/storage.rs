use crate::errors::StorageError;
use crate::models::{ActorSet, Key, StoreId, VoteMap};

/// Persistence of key → signed actor set.
///
/// Reads never fail on a missing key. `store_batch` is the only mutating
/// operation and is idempotent for a fixed `current`.
pub trait VotingStorage: Send + Sync {
    /// Identity used to match `StoreChangedEvent`s.
    fn storage_id(&self) -> &StoreId;

    /// Persisted actor set of one key, empty if none.
    fn load(&self, key: Key) -> Result<ActorSet, StorageError>;

    /// Persisted actor sets of `keys`. Keys without rows are absent from
    /// the result rather than present with an empty set.
    fn load_batch(&self, keys: &[Key]) -> Result<VoteMap, StorageError>;

    /// Full snapshot of the store.
    fn load_all(&self) -> Result<VoteMap, StorageError>;

    /// Persist exactly the difference between `current` and `previous`.
    ///
    /// With `previous == None` the previous state of `current`'s keys is
    /// reloaded from storage first. A data-layer failure of the batched
    /// path is recovered by a per-row write of `current`; only
    /// connection-level failures are returned.
    fn store_batch(&self, current: &VoteMap, previous: Option<&VoteMap>)
        -> Result<(), StorageError>;
}
