//! # tally-counter
//!
//! In-memory voting counters over a [`VotingStorage`](tally_core::VotingStorage).
//!
//! Both counters keep a lazily loaded actor-set cache and a per-key count
//! cache, persist through `store_batch` on flush, and subscribe to storage
//! events through the dispatcher passed at construction. They differ only
//! in synchronization:
//!
//! - [`LockBasedVotingCounter`]: one `RwLock` over both caches.
//! - [`NonBlockingVotingCounter`]: a `DashMap` of per-key vote sets, each
//!   updated with a compare-and-swap loop.

pub mod lock_based;
pub mod non_blocking;

pub use lock_based::LockBasedVotingCounter;
pub use non_blocking::NonBlockingVotingCounter;
