//! Counter configuration.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_COUNT_CACHE_CAPACITY;

/// Configuration for voting counters.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct CounterConfig {
    /// Initial capacity of the count cache. Default: 1024.
    pub initial_capacity: Option<usize>,
}

impl CounterConfig {
    pub fn effective_initial_capacity(&self) -> usize {
        self.initial_capacity.unwrap_or(DEFAULT_COUNT_CACHE_CAPACITY)
    }
}
