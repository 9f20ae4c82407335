use std::sync::{Arc, Mutex};

use manifesto_store::ObservableWorldStore;
use manifesto_types::WorldEvent;

/// Receives governance events. Owned and scheduled by the embedding
/// application; emission must never fail into the orchestrator.
pub trait WorldEventSink: Send + Sync {
    fn emit(&self, event: WorldEvent);
}

/// Discards every event.
pub struct NullEventSink;

impl WorldEventSink for NullEventSink {
    fn emit(&self, _event: WorldEvent) {}
}

/// Collects events in order; test double.
#[derive(Default)]
pub struct BufferingEventSink {
    events: Mutex<Vec<WorldEvent>>,
}

impl BufferingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<WorldEvent> {
        self.events.lock().expect("event buffer poisoned").clone()
    }

    pub fn drain(&self) -> Vec<WorldEvent> {
        std::mem::take(&mut *self.events.lock().expect("event buffer poisoned"))
    }
}

impl WorldEventSink for BufferingEventSink {
    fn emit(&self, event: WorldEvent) {
        self.events.lock().expect("event buffer poisoned").push(event);
    }
}

/// Forwards governance events into an observable store's listener table.
pub struct StoreEventSink<S: ObservableWorldStore> {
    store: Arc<S>,
}

impl<S: ObservableWorldStore> StoreEventSink<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S: ObservableWorldStore> WorldEventSink for StoreEventSink<S> {
    fn emit(&self, event: WorldEvent) {
        self.store.publish(&event);
    }
}
