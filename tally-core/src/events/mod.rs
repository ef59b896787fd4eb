//! Change notification: storage lifecycle events and their dispatch.

pub mod dispatcher;
pub mod handler;
pub mod types;

pub use dispatcher::EventDispatcher;
pub use handler::StorageEventHandler;
pub use types::{StorageReadyEvent, StoreChangedEvent};
