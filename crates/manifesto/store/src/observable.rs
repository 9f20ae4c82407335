use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use manifesto_types::{WorldEvent, WorldEventKind};
use tracing::warn;

use crate::traits::WorldStore;

/// Callback invoked for published governance events.
pub type EventListener = Arc<dyn Fn(&WorldEvent) + Send + Sync>;

/// Handle returned by a subscription, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Event-emitting extension of the store port. Listeners subscribe per
/// event kind or catch-all; a failing listener never blocks the others.
pub trait ObservableWorldStore: WorldStore {
    fn subscribe(&self, kind: WorldEventKind, listener: EventListener) -> ListenerId;
    fn subscribe_all(&self, listener: EventListener) -> ListenerId;
    fn unsubscribe(&self, id: ListenerId) -> bool;
    fn publish(&self, event: &WorldEvent);
}

/// Listener bookkeeping shared by observable store implementations.
#[derive(Default)]
pub(crate) struct ListenerTable {
    next_id: u64,
    by_kind: HashMap<WorldEventKind, Vec<(ListenerId, EventListener)>>,
    catch_all: Vec<(ListenerId, EventListener)>,
}

impl ListenerTable {
    pub(crate) fn subscribe(&mut self, kind: WorldEventKind, listener: EventListener) -> ListenerId {
        let id = self.allocate();
        self.by_kind.entry(kind).or_default().push((id, listener));
        id
    }

    pub(crate) fn subscribe_all(&mut self, listener: EventListener) -> ListenerId {
        let id = self.allocate();
        self.catch_all.push((id, listener));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let mut removed = false;
        for listeners in self.by_kind.values_mut() {
            let before = listeners.len();
            listeners.retain(|(listener_id, _)| *listener_id != id);
            removed |= listeners.len() != before;
        }
        let before = self.catch_all.len();
        self.catch_all.retain(|(listener_id, _)| *listener_id != id);
        removed | (self.catch_all.len() != before)
    }

    /// Dispatch to kind-specific listeners first, then the catch-all set.
    /// A panicking listener is logged and skipped.
    pub(crate) fn dispatch(&self, event: &WorldEvent) {
        let kind_listeners = self
            .by_kind
            .get(&event.kind())
            .map(Vec::as_slice)
            .unwrap_or_default();
        for (id, listener) in kind_listeners.iter().chain(self.catch_all.iter()) {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                warn!(
                    listener = id.0,
                    event = %event.kind(),
                    "event listener panicked; continuing dispatch"
                );
            }
        }
    }

    fn allocate(&mut self) -> ListenerId {
        self.next_id += 1;
        ListenerId(self.next_id)
    }
}
