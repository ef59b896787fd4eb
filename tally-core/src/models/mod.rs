//! Vote model: keys, actors, signed vote tokens and per-key actor sets.

pub mod actor_set;
pub mod flush_mode;
pub mod store_id;
pub mod vote;

pub use actor_set::{ActorSet, VoteMap};
pub use flush_mode::FlushMode;
pub use store_id::{StorageKind, StoreId};
pub use vote::{Direction, Vote, VoteToken};

/// Identity of the item being voted on. Opaque to the counter.
pub type Key = i32;

/// Identity of the voting entity. Always strictly positive.
pub type Actor = i32;

/// Panics unless `actor` is a valid (strictly positive) actor id.
#[inline]
#[track_caller]
pub fn assert_actor(actor: Actor) {
    assert!(actor > 0, "actor unsupported: {actor}");
}
