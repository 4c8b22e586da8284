//! Signal/slot system for Reachability.
//!
//! Signals are a broadcast side-channel: an owner emits a value and every
//! connected slot (callback) receives a reference to it.
//!
//! # Connection Types
//!
//! - **Direct**: Slot is called immediately in the emitting thread (default)
//! - **Queued**: Slot execution is posted to a [`Dispatcher`] thread, so it
//!   always runs on the same execution context regardless of the emitter
//!
//! Slots are invoked after the connection table lock has been released, so a
//! slot may freely connect, disconnect or emit on the same signal.
//!
//! # Example
//!
//! ```
//! use reachability_core::Signal;
//!
//! let online_changed = Signal::<bool>::new();
//!
//! let conn_id = online_changed.connect(|online| {
//!     println!("Online: {}", online);
//! });
//!
//! online_changed.emit(true);
//! online_changed.disconnect(conn_id);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::dispatcher::Dispatcher;
use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a signal-slot connection.
    ///
    /// Use this ID to disconnect a specific connection via [`Signal::disconnect`].
    pub struct ConnectionId;
}

/// Specifies how a connected slot should be invoked when the signal is emitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionType {
    /// Invoke the slot immediately in the emitting thread.
    #[default]
    Direct,

    /// Post the slot invocation to the global [`Dispatcher`] thread.
    ///
    /// Slots connected this way observe emissions in emission order, always
    /// on the dispatcher thread.
    Queued,
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

enum Delivery {
    Direct,
    Queued(Dispatcher),
}

struct Connection<Args> {
    slot: Slot<Args>,
    delivery: Delivery,
}

type ConnectionTable<Args> = Mutex<SlotMap<ConnectionId, Connection<Args>>>;

/// A type-safe signal that can have multiple connected slots.
///
/// `Signal<Args>` is `Send + Sync` and can be shared between threads.
pub struct Signal<Args> {
    connections: Arc<ConnectionTable<Args>>,
    blocked: AtomicBool,
}

impl<Args: Clone + Send + 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: Clone + Send + 'static> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: Arc::new(Mutex::new(SlotMap::with_key())),
            blocked: AtomicBool::new(false),
        }
    }

    /// Connect a slot that is invoked directly in the emitting thread.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.connect_with_type(slot, ConnectionType::Direct)
    }

    /// Connect a slot with a specific connection type.
    ///
    /// If the global dispatcher is unavailable, queued connections degrade
    /// to direct invocation.
    pub fn connect_with_type<F>(&self, slot: F, connection_type: ConnectionType) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let delivery = match connection_type {
            ConnectionType::Direct => Delivery::Direct,
            ConnectionType::Queued => match Dispatcher::global() {
                Some(dispatcher) => Delivery::Queued(dispatcher.clone()),
                None => {
                    tracing::warn!(
                        target: targets::SIGNAL,
                        "no dispatcher available for queued connection, using direct delivery"
                    );
                    Delivery::Direct
                }
            },
        };
        self.insert(Arc::new(slot), delivery)
    }

    /// Connect a slot that runs on the given dispatcher's thread.
    pub fn connect_on<F>(&self, dispatcher: &Dispatcher, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.insert(Arc::new(slot), Delivery::Queued(dispatcher.clone()))
    }

    /// Connect a slot that is disconnected when the returned guard is dropped.
    pub fn connect_scoped<F>(&self, slot: F) -> ConnectionGuard<Args>
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = self.connect(slot);
        ConnectionGuard {
            connections: Arc::downgrade(&self.connections),
            id,
        }
    }

    fn insert(&self, slot: Slot<Args>, delivery: Delivery) -> ConnectionId {
        self.connections.lock().insert(Connection { slot, delivery })
    }

    /// Disconnect a specific slot by its connection ID.
    ///
    /// Returns `true` if the connection was found and removed.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }

    /// Disconnect all slots from this signal.
    pub fn disconnect_all(&self) {
        self.connections.lock().clear();
    }

    /// Get the number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Block signal emission temporarily.
    ///
    /// While blocked, calls to `emit()` do nothing.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Check if signal emission is currently blocked.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Emit the signal, invoking all connected slots.
    ///
    /// Direct slots run before this returns; queued slots are posted to
    /// their dispatcher with a clone of `args`.
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "signal blocked, skipping emit");
            return;
        }

        let snapshot: Vec<(Slot<Args>, Option<Dispatcher>)> = {
            let connections = self.connections.lock();
            connections
                .values()
                .map(|conn| {
                    let dispatcher = match &conn.delivery {
                        Delivery::Direct => None,
                        Delivery::Queued(dispatcher) => Some(dispatcher.clone()),
                    };
                    (conn.slot.clone(), dispatcher)
                })
                .collect()
        };
        tracing::trace!(target: targets::SIGNAL, connection_count = snapshot.len(), "emitting signal");

        for (slot, dispatcher) in snapshot {
            match dispatcher {
                None => slot(&args),
                Some(dispatcher) => {
                    let queued_args = args.clone();
                    let queued_slot = slot.clone();
                    if dispatcher.post(move || queued_slot(&queued_args)).is_err() {
                        tracing::warn!(
                            target: targets::SIGNAL,
                            dispatcher = dispatcher.name(),
                            "dispatcher closed, invoking slot directly"
                        );
                        slot(&args);
                    }
                }
            }
        }
    }
}

/// RAII guard that disconnects its slot when dropped.
///
/// The guard only holds a weak reference, so it may outlive its signal.
pub struct ConnectionGuard<Args> {
    connections: Weak<ConnectionTable<Args>>,
    id: ConnectionId,
}

impl<Args> ConnectionGuard<Args> {
    /// The guarded connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl<Args> Drop for ConnectionGuard<Args> {
    fn drop(&mut self) {
        if let Some(connections) = self.connections.upgrade() {
            connections.lock().remove(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn test_signal_connect_emit() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        signal.connect(move |&value| {
            received_clone.lock().push(value);
        });

        signal.emit(42);
        signal.emit(100);

        assert_eq!(*received.lock(), vec![42, 100]);
    }

    #[test]
    fn test_signal_disconnect() {
        let signal = Signal::<i32>::new();
        let count = Arc::new(AtomicUsize::new(0));

        let count_clone = count.clone();
        let id = signal.connect(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        signal.emit(1);
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit(2);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_signal_blocked() {
        let signal = Signal::<()>::new();
        let count = Arc::new(AtomicUsize::new(0));

        let count_clone = count.clone();
        signal.connect(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        signal.set_blocked(true);
        signal.emit(());
        assert_eq!(count.load(Ordering::SeqCst), 0);

        signal.set_blocked(false);
        signal.emit(());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_connection_guard() {
        let signal = Signal::<i32>::new();
        let total = Arc::new(AtomicUsize::new(0));
        {
            let total_clone = total.clone();
            let _guard = signal.connect_scoped(move |&n| {
                total_clone.fetch_add(n as usize, Ordering::SeqCst);
            });
            signal.emit(42);
        }
        signal.emit(43);

        assert_eq!(total.load(Ordering::SeqCst), 42);
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_guard_outlives_signal() {
        let signal = Signal::<i32>::new();
        let guard = signal.connect_scoped(|_| {});
        drop(signal);
        drop(guard);
    }

    #[test]
    fn test_slot_may_disconnect_during_emit() {
        let signal = Arc::new(Signal::<i32>::new());
        let id_cell = Arc::new(Mutex::new(None));

        let signal_clone = signal.clone();
        let id_clone = id_cell.clone();
        let id = signal.connect(move |_| {
            if let Some(id) = id_clone.lock().take() {
                signal_clone.disconnect(id);
            }
        });
        *id_cell.lock() = Some(id);

        signal.emit(1);
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_queued_connection_runs_on_dispatcher() {
        let dispatcher = Dispatcher::new("signal-test").unwrap();
        let signal = Signal::<i32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = seen.clone();
        signal.connect_on(&dispatcher, move |&value| {
            seen_clone.lock().push((value, std::thread::current().id()));
        });

        let signal = Arc::new(signal);
        let emitter = {
            let signal = signal.clone();
            std::thread::spawn(move || {
                for i in 0..10 {
                    signal.emit(i);
                }
            })
        };
        emitter.join().unwrap();

        assert!(dispatcher.flush(Duration::from_secs(5)));
        let seen = seen.lock();
        assert_eq!(seen.iter().map(|(v, _)| *v).collect::<Vec<_>>(), (0..10).collect::<Vec<_>>());
        assert!(seen.iter().all(|(_, thread)| *thread == dispatcher.thread_id()));
    }

    #[test]
    fn test_emit_from_multiple_threads() {
        let signal = Arc::new(Signal::<i32>::new());
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        signal.connect(move |&value| {
            received_clone.lock().push(value);
        });

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let signal = signal.clone();
                std::thread::spawn(move || signal.emit(i))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut values = received.lock().clone();
        values.sort();
        assert_eq!(values, (0..10).collect::<Vec<_>>());
    }
}
