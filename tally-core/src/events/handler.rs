use super::types::{StorageReadyEvent, StoreChangedEvent};

/// Receiver of storage events. Every method defaults to a no-op.
pub trait StorageEventHandler: Send + Sync {
    fn on_storage_ready(&self, _event: &StorageReadyEvent) {}

    fn on_store_changed(&self, _event: &StoreChangedEvent) {}
}
