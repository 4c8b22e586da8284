//! A common facade over live and mock observers.

use std::sync::Arc;

use crate::memory::InMemoryMemory;
use crate::source::{ManualSource, ManualSourceHandle};
use crate::state::{ConnectionState, InterfaceType};
use crate::store::{StateStore, Subscription};

/// Read and subscribe access to reachability.
///
/// Code that only consumes reachability should depend on this trait, so
/// tests can substitute a [`MockObserver`].
pub trait NetworkObserver: Send + Sync {
    /// Whether the host is currently connected.
    fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// The interface carrying the connection, `None` when offline.
    fn interface_type(&self) -> Option<InterfaceType> {
        self.state().interface_type()
    }

    /// The current snapshot.
    fn state(&self) -> ConnectionState;

    /// Subscribe to state transitions.
    fn subscribe(&self) -> Subscription;

    /// Stop observing. Idempotent.
    fn stop(&self);
}

impl NetworkObserver for StateStore {
    fn state(&self) -> ConnectionState {
        self.read()
    }

    fn subscribe(&self) -> Subscription {
        StateStore::subscribe(self)
    }

    fn stop(&self) {
        StateStore::stop(self)
    }
}

/// An observer driven entirely by hand.
///
/// It behaves like a live store (establishment, de-duplication, side-channel)
/// but never touches the network or any persistent storage.
///
/// ```
/// use reachability::{InterfaceType, MockObserver, NetworkObserver};
///
/// let observer = MockObserver::new();
/// observer.set_connected(true);
/// assert_eq!(observer.interface_type(), Some(InterfaceType::Wifi));
/// ```
pub struct MockObserver {
    store: StateStore,
    handle: ManualSourceHandle,
}

impl MockObserver {
    /// A started mock with no state established yet.
    pub fn new() -> Self {
        let (source, handle) = ManualSource::new();
        let store = StateStore::new(Box::new(source), Arc::new(InMemoryMemory::default()));
        // Registering a manual source cannot fail.
        let _ = store.start();
        Self { store, handle }
    }

    /// Report `state` as if a path source had observed it.
    pub fn set_state(&self, state: ConnectionState) {
        self.handle.send(state.to_status());
    }

    /// Report a WiFi connection, or no connection.
    pub fn set_connected(&self, connected: bool) {
        self.handle.set_connected(connected);
    }

    /// The underlying store, for side-channel access.
    pub fn store(&self) -> &StateStore {
        &self.store
    }
}

impl Default for MockObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockObserver")
            .field("store", &self.store)
            .finish()
    }
}

impl NetworkObserver for MockObserver {
    fn state(&self) -> ConnectionState {
        self.store.read()
    }

    fn subscribe(&self) -> Subscription {
        self.store.subscribe()
    }

    fn stop(&self) {
        self.store.stop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn describe(observer: &dyn NetworkObserver) -> String {
        match observer.interface_type() {
            Some(kind) => format!("online via {kind}"),
            None => "offline".to_string(),
        }
    }

    #[test]
    fn test_mock_through_trait_object() {
        let observer = MockObserver::new();
        assert_eq!(describe(&observer), "offline");

        observer.set_state(ConnectionState::online(InterfaceType::Cellular));
        assert_eq!(describe(&observer), "online via Cellular");
        assert!(observer.is_connected());
    }

    #[test]
    fn test_mock_deduplicates_like_a_live_store() {
        let observer = MockObserver::new();
        let mut sub = observer.subscribe();

        observer.set_connected(true);
        observer.set_connected(true);
        observer.set_state(ConnectionState::offline());

        let seen: Vec<bool> = std::iter::from_fn(|| sub.try_recv())
            .map(|s| s.is_connected())
            .collect();
        assert_eq!(seen, vec![true, false]);
    }

    #[test]
    fn test_mock_stop() {
        let observer = MockObserver::new();
        NetworkObserver::stop(&observer);
        observer.set_connected(true);
        assert!(!observer.is_connected());
    }
}
