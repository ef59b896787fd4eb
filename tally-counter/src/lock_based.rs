//! LockBasedVotingCounter: both caches behind a single `RwLock`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rustc_hash::{FxHashMap, FxHashSet};
use tally_core::config::CounterConfig;
use tally_core::errors::{StorageError, TallyResult};
use tally_core::events::{EventDispatcher, StorageEventHandler, StorageReadyEvent, StoreChangedEvent};
use tally_core::models::{assert_actor, Actor, Direction, FlushMode, Key, Vote, VoteMap};
use tally_core::traits::{VotingCounter, VotingStorage};

#[derive(Default)]
struct CounterState {
    cache: VoteMap,
    counters: FxHashMap<Key, i32>,
}

/// Voting counter guarded by one reader/writer lock.
///
/// Mutations and lazy loads take the write lock; estimates, vote reads of
/// loaded keys and the flush snapshot take the read lock. Storage is never
/// called with the lock held.
///
/// `get_vote`/`get_votes` on an already loaded key only read shared state,
/// so they take the read lock; a miss inserts the loaded set under the
/// write lock.
pub struct LockBasedVotingCounter {
    storage: Arc<dyn VotingStorage>,
    state: RwLock<CounterState>,
    dirty: AtomicBool,
}

impl LockBasedVotingCounter {
    pub fn new(storage: Arc<dyn VotingStorage>, events: &mut EventDispatcher) -> Arc<Self> {
        Self::with_config(storage, &CounterConfig::default(), events)
    }

    /// Build the counter and register it for storage events.
    pub fn with_config(
        storage: Arc<dyn VotingStorage>,
        config: &CounterConfig,
        events: &mut EventDispatcher,
    ) -> Arc<Self> {
        let capacity = config.effective_initial_capacity();
        let counter = Arc::new(Self {
            storage,
            state: RwLock::new(CounterState {
                cache: VoteMap::default(),
                counters: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            }),
            dirty: AtomicBool::new(false),
        });
        events.register(counter.clone());
        counter
    }

    fn read(&self) -> RwLockReadGuard<'_, CounterState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CounterState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load the actor sets of `keys` missing from the cache. A set loaded
    /// concurrently by another caller wins over ours.
    fn ensure_loaded(&self, keys: &[Key]) -> Result<(), StorageError> {
        let missing: Vec<Key> = {
            let state = self.read();
            let missing: FxHashSet<Key> = keys
                .iter()
                .copied()
                .filter(|key| !state.cache.contains_key(key))
                .collect();
            missing.into_iter().collect()
        };

        let mut loaded = match missing.as_slice() {
            [] => return Ok(()),
            [key] => {
                let set = self.storage.load(*key)?;
                VoteMap::from_iter([(*key, set)])
            }
            many => self.storage.load_batch(many)?,
        };

        let mut state = self.write();
        for key in missing {
            if state.cache.contains_key(&key) {
                continue;
            }
            let set = loaded.remove(&key).unwrap_or_default();
            state.counters.insert(key, set.count());
            state.cache.insert(key, set);
        }
        Ok(())
    }

    fn step(&self, key: Key, actor: Actor, direction: Direction) -> TallyResult<i32> {
        assert_actor(actor);
        self.ensure_loaded(&[key])?;

        let mut state = self.write();
        let CounterState { cache, counters } = &mut *state;
        let delta = cache.entry(key).or_default().step(actor, direction);
        let count = counters.entry(key).or_insert(0);
        *count += delta;
        Ok(*count)
    }

    /// Rebuild the count cache from a full storage snapshot. Keys held in
    /// the actor-set cache take their count from the cached set.
    fn resync_counts(&self) -> Result<(), StorageError> {
        let all = self.storage.load_all()?;

        let mut state = self.write();
        let CounterState { cache, counters } = &mut *state;
        counters.clear();
        counters.extend(all.iter().map(|(key, set)| (*key, set.count())));
        counters.extend(cache.iter().map(|(key, set)| (*key, set.count())));

        tracing::info!(
            store = %self.storage.storage_id(),
            keys = counters.len(),
            "count cache resynced from storage"
        );
        Ok(())
    }
}

impl VotingCounter for LockBasedVotingCounter {
    fn increment(&self, key: Key, actor: Actor) -> TallyResult<i32> {
        self.step(key, actor, Direction::Up)
    }

    fn decrement(&self, key: Key, actor: Actor) -> TallyResult<i32> {
        self.step(key, actor, Direction::Down)
    }

    fn get_vote(&self, key: Key, actor: Actor) -> TallyResult<Vote> {
        assert_actor(actor);
        self.ensure_loaded(&[key])?;
        let state = self.read();
        Ok(state
            .cache
            .get(&key)
            .map_or(Vote::None, |set| set.vote_of(actor)))
    }

    fn get_votes(&self, keys: &[Key], actor: Actor) -> TallyResult<FxHashMap<Key, Vote>> {
        assert_actor(actor);
        self.ensure_loaded(keys)?;
        let state = self.read();
        Ok(keys
            .iter()
            .map(|key| {
                let vote = state.cache.get(key).map_or(Vote::None, |set| set.vote_of(actor));
                (*key, vote)
            })
            .collect())
    }

    fn estimate_count(&self, key: Key) -> i32 {
        self.read().counters.get(&key).copied().unwrap_or(0)
    }

    fn estimate_counts(&self, keys: &[Key]) -> FxHashMap<Key, i32> {
        let state = self.read();
        keys.iter()
            .map(|key| (*key, state.counters.get(key).copied().unwrap_or(0)))
            .collect()
    }

    fn flush(&self, mode: FlushMode) -> TallyResult<()> {
        let _span = tracing::info_span!("tally.flush", store = %self.storage.storage_id(), ?mode)
            .entered();

        let snapshot = self.read().cache.clone();
        self.storage.store_batch(&snapshot, None)?;

        let dirty = self.dirty.swap(false, Ordering::AcqRel);
        if dirty || mode.is_full_resync() {
            if let Err(e) = self.resync_counts() {
                if dirty {
                    self.dirty.store(true, Ordering::Release);
                }
                return Err(e.into());
            }
        }
        Ok(())
    }

    fn cache(&self) -> FxHashMap<Key, i32> {
        self.read().counters.clone()
    }
}

impl StorageEventHandler for LockBasedVotingCounter {
    fn on_storage_ready(&self, _event: &StorageReadyEvent) {
        if let Err(e) = self.resync_counts() {
            tracing::error!(store = %self.storage.storage_id(), error = %e, "initial count load failed");
            self.dirty.store(true, Ordering::Release);
        }
    }

    fn on_store_changed(&self, event: &StoreChangedEvent) {
        if event.store_id == *self.storage.storage_id() {
            tracing::info!(store = %event.store_id, "external change detected, marking store dirty");
            self.dirty.store(true, Ordering::Release);
        }
    }
}

impl std::fmt::Debug for LockBasedVotingCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("LockBasedVotingCounter")
            .field("store", self.storage.storage_id())
            .field("cached_keys", &state.cache.len())
            .field("counted_keys", &state.counters.len())
            .field("dirty", &self.dirty.load(Ordering::Relaxed))
            .finish()
    }
}
