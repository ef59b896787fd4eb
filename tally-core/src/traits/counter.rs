use rustc_hash::FxHashMap;

use crate::errors::TallyResult;
use crate::models::{Actor, FlushMode, Key, Vote};

/// Identified `(key, actor) -> {-1, 0, +1}` counting with per-key totals.
///
/// Each actor holds at most one vote per key. Totals returned by the
/// `estimate_*` methods are eventually consistent with the actor sets.
/// Passing an actor `<= 0` is a contract violation and panics.
pub trait VotingCounter: Send + Sync {
    /// Step the actor's vote toward +1 and return the key's new count estimate.
    fn increment(&self, key: Key, actor: Actor) -> TallyResult<i32>;

    /// Step the actor's vote toward -1 and return the key's new count estimate.
    fn decrement(&self, key: Key, actor: Actor) -> TallyResult<i32>;

    fn get_vote(&self, key: Key, actor: Actor) -> TallyResult<Vote>;

    /// Votes of one actor over many keys. Under concurrent modification the
    /// result may not be a read-consistent snapshot.
    fn get_votes(&self, keys: &[Key], actor: Actor) -> TallyResult<FxHashMap<Key, Vote>>;

    /// Cached total of a key, 0 when unknown. Never touches storage.
    fn estimate_count(&self, key: Key) -> i32;

    /// Batched form of [`Self::estimate_count`]; every requested key is present.
    fn estimate_counts(&self, keys: &[Key]) -> FxHashMap<Key, i32>;

    /// Persist the actor-set cache and resync the count cache when an
    /// external change was reported or `mode` asks for it.
    fn flush(&self, mode: FlushMode) -> TallyResult<()>;

    /// Point-in-time copy of the count cache.
    fn cache(&self) -> FxHashMap<Key, i32>;

    /// Final flush before the counter is dropped.
    fn close(&self) -> TallyResult<()> {
        self.flush(FlushMode::Flush)
    }
}
