//! Diff engine: minimal row changes between two vote maps.
//!
//! An empty actor set and an absent key are the same state, so neither
//! side ever produces rows for a key that is empty on both.

use rustc_hash::{FxHashMap, FxHashSet};
use tally_core::models::{Actor, ActorSet, Direction, Key, VoteMap, VoteToken};

/// One persisted vote: `(key, actor, direction)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoteRow {
    pub key: Key,
    pub actor: Actor,
    pub direction: Direction,
}

impl VoteRow {
    pub fn new(key: Key, token: VoteToken) -> Self {
        Self {
            key,
            actor: token.actor(),
            direction: token.direction(),
        }
    }

    pub fn token(&self) -> VoteToken {
        VoteToken::new(self.actor, self.direction)
    }
}

/// Inserts, in-place direction updates and per-key deletions that move a
/// store from `previous` to `current`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteDiff {
    /// Votes of actors with no row for the key.
    pub added: Vec<VoteRow>,
    /// Direction flips of an existing row.
    pub modified: Vec<VoteRow>,
    /// Retracted actors, grouped by key.
    pub deleted: FxHashMap<Key, FxHashSet<Actor>>,
}

impl VoteDiff {
    pub fn compute(current: &VoteMap, previous: &VoteMap) -> Self {
        let mut diff = Self::default();
        let empty = ActorSet::new();

        for (&key, prev) in previous {
            if !prev.is_empty() && !current.contains_key(&key) {
                diff.deleted.insert(key, prev.actors().collect());
            }
        }

        for (&key, cur) in current {
            let prev = previous.get(&key).unwrap_or(&empty);

            for token in cur.iter() {
                if prev.contains(token.opposite()) {
                    diff.modified.push(VoteRow::new(key, token));
                } else if !prev.contains(token) {
                    diff.added.push(VoteRow::new(key, token));
                }
            }

            let retracted: FxHashSet<Actor> = prev
                .actors()
                .filter(|&actor| !cur.contains_actor(actor))
                .collect();
            if !retracted.is_empty() {
                diff.deleted.insert(key, retracted);
            }
        }

        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Number of row operations.
    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.values().map(|a| a.len()).sum::<usize>()
    }

    /// Keys touched by at least one operation.
    pub fn changed_keys(&self) -> FxHashSet<Key> {
        self.added
            .iter()
            .chain(&self.modified)
            .map(|row| row.key)
            .chain(self.deleted.keys().copied())
            .collect()
    }

    /// Apply the operations to `state`. Keys left without votes are removed.
    pub fn apply_to(&self, state: &mut VoteMap) {
        for row in self.added.iter().chain(&self.modified) {
            state.entry(row.key).or_default().set(row.token());
        }
        for (key, actors) in &self.deleted {
            if let Some(set) = state.get_mut(key) {
                for &actor in actors {
                    set.remove_actor(actor);
                }
            }
        }
        state.retain(|_, set| !set.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(Key, &[i32])]) -> VoteMap {
        entries
            .iter()
            .map(|(key, raw)| (*key, ActorSet::from_raw(raw.iter().copied()).unwrap()))
            .collect()
    }

    fn sorted(mut rows: Vec<VoteRow>) -> Vec<VoteRow> {
        rows.sort_by_key(|r| (r.key, r.actor));
        rows
    }

    #[test]
    fn identical_maps_produce_empty_diff() {
        let state = map(&[(1, &[1, -2]), (2, &[3])]);
        let diff = VoteDiff::compute(&state, &state);
        assert!(diff.is_empty());
        assert_eq!(diff.len(), 0);
    }

    #[test]
    fn new_key_is_all_inserts() {
        let diff = VoteDiff::compute(&map(&[(5, &[1, -2])]), &VoteMap::default());
        assert_eq!(
            sorted(diff.added),
            vec![
                VoteRow { key: 5, actor: 1, direction: Direction::Up },
                VoteRow { key: 5, actor: 2, direction: Direction::Down },
            ]
        );
        assert!(diff.modified.is_empty());
        assert!(diff.deleted.is_empty());
    }

    #[test]
    fn flip_is_a_modification() {
        let diff = VoteDiff::compute(&map(&[(1, &[-7])]), &map(&[(1, &[7])]));
        assert!(diff.added.is_empty());
        assert_eq!(
            diff.modified,
            vec![VoteRow { key: 1, actor: 7, direction: Direction::Down }]
        );
    }

    #[test]
    fn retraction_and_missing_key_are_deletions() {
        let current = map(&[(1, &[1])]);
        let previous = map(&[(1, &[1, -2, 3]), (2, &[4, -5])]);
        let diff = VoteDiff::compute(&current, &previous);

        assert_eq!(diff.deleted[&1], [2, 3].into_iter().collect::<FxHashSet<_>>());
        assert_eq!(diff.deleted[&2], [4, 5].into_iter().collect::<FxHashSet<_>>());
        assert_eq!(diff.changed_keys(), [1, 2].into_iter().collect::<FxHashSet<_>>());
    }

    #[test]
    fn empty_set_equals_absent_key() {
        let current = map(&[(1, &[]), (2, &[])]);
        let previous = map(&[(3, &[])]);
        assert!(VoteDiff::compute(&current, &previous).is_empty());

        let current = map(&[(1, &[])]);
        let previous = map(&[(1, &[4])]);
        let diff = VoteDiff::compute(&current, &previous);
        assert_eq!(diff.deleted[&1], [4].into_iter().collect::<FxHashSet<_>>());
    }

    #[test]
    fn apply_reproduces_current() {
        let current = map(&[(1, &[1, 2]), (3, &[-9])]);
        let previous = map(&[(1, &[-1, 5]), (2, &[6])]);
        let diff = VoteDiff::compute(&current, &previous);

        let mut state = previous.clone();
        diff.apply_to(&mut state);
        assert_eq!(state, current);
    }
}
