//! Event payload types.

use crate::models::StoreId;

/// Payload for `on_storage_ready`: backing stores are initialized.
#[derive(Debug, Clone, Default)]
pub struct StorageReadyEvent;

/// Payload for `on_store_changed`: a store was mutated out-of-band.
#[derive(Debug, Clone)]
pub struct StoreChangedEvent {
    pub store_id: StoreId,
}

impl StoreChangedEvent {
    pub fn new(store_id: StoreId) -> Self {
        Self { store_id }
    }
}
