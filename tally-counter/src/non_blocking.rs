//! NonBlockingVotingCounter: per-key vote sets updated by compare-and-swap.
//!
//! Each loaded key owns an [`ArcSwap`] holding an immutable snapshot of its
//! actor set together with the count derived from it. A vote clones the
//! snapshot, steps it, and swaps it in only if no other writer got there
//! first; the count delta always comes from the snapshot that was swapped.
//! Different keys never contend. Totals of keys that were never loaded
//! come from the storage-seeded `counts` map.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};
use tally_core::config::CounterConfig;
use tally_core::errors::{StorageError, TallyResult};
use tally_core::events::{EventDispatcher, StorageEventHandler, StorageReadyEvent, StoreChangedEvent};
use tally_core::models::{assert_actor, Actor, ActorSet, Direction, FlushMode, Key, Vote, VoteMap};
use tally_core::traits::{VotingCounter, VotingStorage};

#[derive(Clone)]
struct VoteState {
    votes: ActorSet,
    count: i32,
}

/// The atomically replaceable state of one key.
struct VoteSet {
    state: ArcSwap<VoteState>,
}

impl VoteSet {
    fn new(votes: ActorSet) -> Self {
        let count = votes.count();
        Self {
            state: ArcSwap::from_pointee(VoteState { votes, count }),
        }
    }

    /// Step `actor` toward `direction` and return the resulting count.
    fn step(&self, actor: Actor, direction: Direction) -> i32 {
        loop {
            let current = self.state.load();
            let mut next = VoteState::clone(&current);
            let delta = next.votes.step(actor, direction);
            if delta == 0 {
                return current.count;
            }
            next.count += delta;
            let count = next.count;

            let previous = self.state.compare_and_swap(&current, Arc::new(next));
            if Arc::ptr_eq(&*previous, &*current) {
                return count;
            }
        }
    }

    fn vote_of(&self, actor: Actor) -> Vote {
        self.state.load().votes.vote_of(actor)
    }

    fn count(&self) -> i32 {
        self.state.load().count
    }

    fn votes(&self) -> ActorSet {
        self.state.load().votes.clone()
    }
}

pub struct NonBlockingVotingCounter {
    storage: Arc<dyn VotingStorage>,
    cache: DashMap<Key, Arc<VoteSet>, FxBuildHasher>,
    counts: DashMap<Key, i32, FxBuildHasher>,
    dirty: AtomicBool,
}

impl NonBlockingVotingCounter {
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
            cache: DashMap::with_hasher(FxBuildHasher),
            counts: DashMap::with_capacity_and_hasher(capacity, FxBuildHasher),
            dirty: AtomicBool::new(false),
        });
        events.register(counter.clone());
        counter
    }

    fn cached(&self, key: Key) -> Option<Arc<VoteSet>> {
        self.cache.get(&key).map(|entry| Arc::clone(entry.value()))
    }

    /// Install a loaded set unless another caller already did.
    fn install(&self, key: Key, votes: ActorSet) -> Arc<VoteSet> {
        let entry = self
            .cache
            .entry(key)
            .or_insert_with(|| Arc::new(VoteSet::new(votes)));
        Arc::clone(entry.value())
    }

    fn vote_set(&self, key: Key) -> Result<Arc<VoteSet>, StorageError> {
        if let Some(set) = self.cached(key) {
            return Ok(set);
        }
        let votes = self.storage.load(key)?;
        Ok(self.install(key, votes))
    }

    fn ensure_loaded(&self, keys: &[Key]) -> Result<(), StorageError> {
        let missing: FxHashSet<Key> = keys
            .iter()
            .copied()
            .filter(|key| !self.cache.contains_key(key))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        let missing: Vec<Key> = missing.into_iter().collect();
        let mut loaded = self.storage.load_batch(&missing)?;
        for key in missing {
            self.install(key, loaded.remove(&key).unwrap_or_default());
        }
        Ok(())
    }

    fn step(&self, key: Key, actor: Actor, direction: Direction) -> TallyResult<i32> {
        assert_actor(actor);
        Ok(self.vote_set(key)?.step(actor, direction))
    }

    fn count_of(&self, key: Key) -> i32 {
        match self.cached(key) {
            Some(set) => set.count(),
            None => self.counts.get(&key).map_or(0, |count| *count),
        }
    }

    /// Replace the seeded totals with a full storage snapshot. Loaded keys
    /// keep counting from their own sets.
    fn resync_counts(&self) -> Result<(), StorageError> {
        let all = self.storage.load_all()?;
        let fresh: FxHashMap<Key, i32> = all.iter().map(|(key, set)| (*key, set.count())).collect();

        self.counts.retain(|key, _| fresh.contains_key(key));
        for (key, count) in fresh {
            self.counts.insert(key, count);
        }

        tracing::info!(
            store = %self.storage.storage_id(),
            keys = self.counts.len(),
            "count cache resynced from storage"
        );
        Ok(())
    }

    fn snapshot(&self) -> VoteMap {
        self.cache
            .iter()
            .map(|entry| (*entry.key(), entry.value().votes()))
            .collect()
    }
}

impl VotingCounter for NonBlockingVotingCounter {
    fn increment(&self, key: Key, actor: Actor) -> TallyResult<i32> {
        self.step(key, actor, Direction::Up)
    }

    fn decrement(&self, key: Key, actor: Actor) -> TallyResult<i32> {
        self.step(key, actor, Direction::Down)
    }

    fn get_vote(&self, key: Key, actor: Actor) -> TallyResult<Vote> {
        assert_actor(actor);
        Ok(self.vote_set(key)?.vote_of(actor))
    }

    fn get_votes(&self, keys: &[Key], actor: Actor) -> TallyResult<FxHashMap<Key, Vote>> {
        assert_actor(actor);
        self.ensure_loaded(keys)?;
        Ok(keys
            .iter()
            .map(|key| {
                let vote = self.cached(*key).map_or(Vote::None, |set| set.vote_of(actor));
                (*key, vote)
            })
            .collect())
    }

    fn estimate_count(&self, key: Key) -> i32 {
        self.count_of(key)
    }

    fn estimate_counts(&self, keys: &[Key]) -> FxHashMap<Key, i32> {
        keys.iter().map(|key| (*key, self.count_of(*key))).collect()
    }

    fn flush(&self, mode: FlushMode) -> TallyResult<()> {
        let _span = tracing::info_span!("tally.flush", store = %self.storage.storage_id(), ?mode)
            .entered();

        self.storage.store_batch(&self.snapshot(), None)?;

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
        let mut counts: FxHashMap<Key, i32> = self
            .counts
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        counts.extend(self.cache.iter().map(|entry| (*entry.key(), entry.value().count())));
        counts
    }
}

impl StorageEventHandler for NonBlockingVotingCounter {
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

impl std::fmt::Debug for NonBlockingVotingCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonBlockingVotingCounter")
            .field("store", self.storage.storage_id())
            .field("cached_keys", &self.cache.len())
            .field("counted_keys", &self.counts.len())
            .field("dirty", &self.dirty.load(Ordering::Relaxed))
            .finish()
    }
}
