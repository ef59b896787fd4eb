//! EventDispatcher: synchronous event dispatch to registered handlers.

use std::sync::Arc;

use super::handler::StorageEventHandler;
use super::types::{StorageReadyEvent, StoreChangedEvent};

/// Synchronous event dispatcher wrapping a list of handlers.
///
/// Delivery is in registration order on the emitting thread. A handler
/// that panics is logged and skipped; later handlers still receive the event.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn StorageEventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn StorageEventHandler>) {
        self.handlers.push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    fn emit<F: Fn(&dyn StorageEventHandler)>(&self, event_name: &'static str, f: F) {
        for handler in &self.handlers {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                f(handler.as_ref());
            }));
            if result.is_err() {
                tracing::error!(event = event_name, "event handler panicked");
            }
        }
    }

    pub fn emit_storage_ready(&self, event: &StorageReadyEvent) {
        self.emit("storage_ready", |h| h.on_storage_ready(event));
    }

    pub fn emit_store_changed(&self, event: &StoreChangedEvent) {
        self.emit("store_changed", |h| h.on_store_changed(event));
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
