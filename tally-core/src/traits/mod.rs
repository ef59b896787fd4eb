//! Capability traits implemented by the storage and counter crates.

pub mod counter;
pub mod storage;

pub use counter::VotingCounter;
pub use storage::VotingStorage;
