//! Per-key set of signed vote tokens.
//!
//! The set holds at most one token per actor: casting the opposite
//! direction replaces the token, retracting removes it. The count of a
//! key is the sum of the token signs and is always derivable from the set.
//!
//! # Examples
//!
//! ```
//! use tally_core::{ActorSet, Direction, Vote};
//!
//! let mut votes = ActorSet::new();
//! assert_eq!(votes.step(10, Direction::Up), 1);
//! assert_eq!(votes.step(20, Direction::Down), -1);
//! assert_eq!(votes.count(), 0);
//!
//! // A second step in the other direction retracts the vote.
//! assert_eq!(votes.step(10, Direction::Down), -1);
//! assert_eq!(votes.vote_of(10), Vote::None);
//! ```

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use super::{assert_actor, Actor, Direction, Key, Vote, VoteToken};
use crate::errors::StorageError;

/// Key → actor set. The unit handed to storage and to the diff engine.
pub type VoteMap = FxHashMap<Key, ActorSet>;

#[derive(Clone, Default, PartialEq, Eq)]
pub struct ActorSet {
    tokens: FxHashSet<VoteToken>,
}

impl ActorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from raw signed tokens (`+actor` / `-actor`).
    ///
    /// Rejects zero, `i32::MIN`, and an actor present with both signs.
    pub fn from_raw<I: IntoIterator<Item = i32>>(raw: I) -> Result<Self, StorageError> {
        let mut set = Self::new();
        for value in raw {
            let token = VoteToken::from_raw(value)?;
            if set.tokens.contains(&token.opposite()) {
                return Err(StorageError::corruption(format!(
                    "actor {} has both vote directions",
                    token.actor()
                )));
            }
            set.tokens.insert(token);
        }
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn contains(&self, token: VoteToken) -> bool {
        self.tokens.contains(&token)
    }

    /// True when the actor has a token of either sign.
    pub fn contains_actor(&self, actor: Actor) -> bool {
        self.vote_of(actor) != Vote::None
    }

    #[track_caller]
    pub fn vote_of(&self, actor: Actor) -> Vote {
        assert_actor(actor);
        if self.tokens.contains(&VoteToken::up(actor)) {
            Vote::Up
        } else if self.tokens.contains(&VoteToken::down(actor)) {
            Vote::Down
        } else {
            Vote::None
        }
    }

    /// Record `token`, replacing the actor's opposite token if present.
    /// Returns true when the set changed.
    pub fn set(&mut self, token: VoteToken) -> bool {
        self.tokens.remove(&token.opposite());
        self.tokens.insert(token)
    }

    /// Remove whatever token the actor holds.
    pub fn remove_actor(&mut self, actor: Actor) -> Option<VoteToken> {
        let up = VoteToken::up(actor);
        if self.tokens.remove(&up) {
            return Some(up);
        }
        let down = VoteToken::down(actor);
        self.tokens.remove(&down).then_some(down)
    }

    /// Move the actor's vote one step toward `direction`, clamped to
    /// [-1, +1], and return the resulting change of [`Self::count`].
    ///
    /// An opposite token is removed (retraction); otherwise the token is
    /// inserted if absent. Stepping in the direction already held is a
    /// no-op with delta 0.
    #[track_caller]
    pub fn step(&mut self, actor: Actor, direction: Direction) -> i32 {
        let token = VoteToken::new(actor, direction);
        if self.tokens.remove(&token.opposite()) || self.tokens.insert(token) {
            direction.value()
        } else {
            0
        }
    }

    /// Sum of token signs.
    pub fn count(&self) -> i32 {
        self.tokens.iter().map(|t| t.direction().value()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = VoteToken> + '_ {
        self.tokens.iter().copied()
    }

    /// Unsigned actor ids.
    pub fn actors(&self) -> impl Iterator<Item = Actor> + '_ {
        self.tokens.iter().map(|t| t.actor())
    }

    /// Tokens sorted by raw value, for stable output.
    pub fn to_sorted_vec(&self) -> Vec<VoteToken> {
        let mut tokens: Vec<_> = self.tokens.iter().copied().collect();
        tokens.sort_unstable();
        tokens
    }
}

impl FromIterator<VoteToken> for ActorSet {
    fn from_iter<I: IntoIterator<Item = VoteToken>>(iter: I) -> Self {
        let mut set = Self::new();
        for token in iter {
            set.set(token);
        }
        set
    }
}

impl fmt::Debug for ActorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.to_sorted_vec()).finish()
    }
}

impl Serialize for ActorSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_sorted_vec().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ActorSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<i32>::deserialize(deserializer)?;
        Self::from_raw(raw).map_err(serde::de::Error::custom)
    }
}
