//! Advisory check that a caller-supplied previous snapshot still matches
//! what the store holds.

use rustc_hash::FxHashSet;
use tally_core::constants::MAX_REPORTED_MISMATCHES;
use tally_core::errors::StorageError;
use tally_core::models::{ActorSet, Key, VoteMap, VoteToken};
use tally_core::traits::VotingStorage;

/// One key whose stored set differs from the expected one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMismatch {
    pub key: Key,
    pub expected: ActorSet,
    pub actual: ActorSet,
}

impl KeyMismatch {
    /// Tokens present in the store but not expected.
    pub fn added_in_store(&self) -> Vec<VoteToken> {
        let mut tokens: Vec<_> = self
            .actual
            .iter()
            .filter(|t| !self.expected.contains(*t))
            .collect();
        tokens.sort_unstable();
        tokens
    }

    /// Expected tokens missing from the store.
    pub fn removed_in_store(&self) -> Vec<VoteToken> {
        let mut tokens: Vec<_> = self
            .expected
            .iter()
            .filter(|t| !self.actual.contains(*t))
            .collect();
        tokens.sort_unstable();
        tokens
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub checked_keys: usize,
    pub mismatches: Vec<KeyMismatch>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Reload every key of `current` and `previous` and compare the stored
/// sets with `previous`. Keys only in `current` are expected to be empty.
///
/// Mismatches are logged at warn, with at most
/// [`MAX_REPORTED_MISMATCHES`] detailed lines.
pub fn check_storage_consistency<S>(
    storage: &S,
    current: &VoteMap,
    previous: &VoteMap,
) -> Result<ConsistencyReport, StorageError>
where
    S: VotingStorage + ?Sized,
{
    let keys: FxHashSet<Key> = current.keys().chain(previous.keys()).copied().collect();
    let mut keys: Vec<Key> = keys.into_iter().collect();
    keys.sort_unstable();

    let stored = storage.load_batch(&keys)?;
    let empty = ActorSet::new();

    let mismatches: Vec<KeyMismatch> = keys
        .iter()
        .filter_map(|key| {
            let expected = previous.get(key).unwrap_or(&empty);
            let actual = stored.get(key).unwrap_or(&empty);
            (expected != actual).then(|| KeyMismatch {
                key: *key,
                expected: expected.clone(),
                actual: actual.clone(),
            })
        })
        .collect();

    if !mismatches.is_empty() {
        tracing::warn!(
            store = %storage.storage_id(),
            mismatches = mismatches.len(),
            checked = keys.len(),
            "previous vote state is stale relative to storage"
        );
        for mismatch in mismatches.iter().take(MAX_REPORTED_MISMATCHES) {
            tracing::warn!(
                store = %storage.storage_id(),
                key = mismatch.key,
                added_in_store = ?mismatch.added_in_store(),
                removed_in_store = ?mismatch.removed_in_store(),
                "vote state mismatch"
            );
        }
    }

    Ok(ConsistencyReport {
        checked_keys: keys.len(),
        mismatches,
    })
}
