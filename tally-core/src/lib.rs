//! # tally-core
//!
//! Foundation crate for identified voting counters.
//! Defines the vote model, the storage and counter traits, errors, config,
//! change-notification events, and constants. The storage and counter
//! crates both depend on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod events;
pub mod models;
pub mod traits;
pub mod tracing_setup;

// Re-export the most commonly used types at the crate root.
pub use config::TallyConfig;
pub use errors::{ConfigError, StorageError, TallyError, TallyResult};
pub use events::{EventDispatcher, StorageEventHandler, StorageReadyEvent, StoreChangedEvent};
pub use models::{
    Actor, ActorSet, Direction, FlushMode, Key, StorageKind, StoreId, Vote, VoteMap, VoteToken,
};
pub use traits::{VotingCounter, VotingStorage};
