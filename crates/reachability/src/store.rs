//! The state-synchronization engine.
//!
//! [`StateStore`] owns the current [`ConnectionState`] and arbitrates every
//! raw event from its single [`PathSource`]. The rules it enforces:
//!
//! - Nothing is published before the first real event. Subscribers that
//!   arrive early wait for it; they never see a placeholder.
//! - The first event establishes the state. It is persisted and becomes the
//!   first element of every subscription, but the side-channel stays quiet.
//! - Later events only matter when `connected` flips. A flip is persisted,
//!   published to subscribers in order, and announced on the side-channel.
//! - An event that keeps `connected` but changes the interface type updates
//!   the stored state silently; consumers key off online/offline only.
//!
//! State is mutated under one mutex, and every externally visible effect
//! (persistence, publication, signal emission) happens after it is released.
//! Publication is version-checked, so a subscriber that registers between
//! the mutation and the publish is neither skipped nor served twice.

use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use parking_lot::Mutex;
use reachability_core::logging::targets;
use reachability_core::{ConnectionId, ConnectionType, Signal};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::memory::ConnectionMemory;
use crate::source::{PathCallback, PathSource};
use crate::state::{ConnectionState, InterfaceType, PathStatus};

/// Side-channel payload, fired on every accepted transition after the
/// initial state was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReachabilityChanged {
    /// The new connected flag.
    pub is_connected: bool,
}

struct StoreState {
    current: ConnectionState,
    established: bool,
    stopped: bool,
    /// Bumped on establishment and on every accepted transition.
    version: u64,
}

struct Subscriber {
    sender: mpsc::UnboundedSender<ConnectionState>,
    /// Version of the last state delivered to this subscriber, 0 for none.
    delivered: u64,
}

struct StoreShared {
    state: Mutex<StoreState>,
    subscribers: Mutex<Vec<Subscriber>>,
    memory: Arc<dyn ConnectionMemory>,
    changed: Signal<ReachabilityChanged>,
}

struct SourceSlot {
    source: Option<Box<dyn PathSource>>,
    started: bool,
}

enum Accepted {
    Established,
    Transition,
}

/// Tracks reachability reported by one path source.
///
/// Dropping the store stops the source before returning.
pub struct StateStore {
    shared: Arc<StoreShared>,
    source: Mutex<SourceSlot>,
}

impl StateStore {
    /// Create an idle store around `source`.
    ///
    /// Nothing is observed until [`start`](Self::start) is called.
    pub fn new(source: Box<dyn PathSource>, memory: Arc<dyn ConnectionMemory>) -> Self {
        Self {
            shared: Arc::new(StoreShared {
                state: Mutex::new(StoreState {
                    current: ConnectionState::offline(),
                    established: false,
                    stopped: false,
                    version: 0,
                }),
                subscribers: Mutex::new(Vec::new()),
                memory,
                changed: Signal::new(),
            }),
            source: Mutex::new(SourceSlot {
                source: Some(source),
                started: false,
            }),
        }
    }

    /// Start the source. Idempotent, and a no-op after [`stop`](Self::stop).
    pub fn start(&self) -> Result<()> {
        let mut slot = self.source.lock();
        if slot.started || self.shared.state.lock().stopped {
            return Ok(());
        }
        let Some(source) = slot.source.as_mut() else {
            return Ok(());
        };

        let weak: Weak<StoreShared> = Arc::downgrade(&self.shared);
        let callback: PathCallback = Arc::new(move |status| {
            if let Some(shared) = weak.upgrade() {
                shared.ingest(status);
            }
        });

        source.start(callback)?;
        tracing::debug!(target: targets::STORE, source = source.name(), "state store started");
        slot.started = true;
        Ok(())
    }

    /// Stop the source, complete every subscription and ignore later events.
    ///
    /// Safe to call repeatedly and from any thread.
    pub fn stop(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.stopped {
                return;
            }
            state.stopped = true;
        }

        let source = {
            let mut slot = self.source.lock();
            slot.started = false;
            slot.source.take()
        };
        if let Some(mut source) = source {
            source.stop();
            tracing::debug!(target: targets::STORE, source = source.name(), "state store stopped");
        }

        // Dropping the senders completes every open subscription.
        self.shared.subscribers.lock().clear();
    }

    /// The current snapshot.
    pub fn read(&self) -> ConnectionState {
        self.shared.state.lock().current
    }

    /// Whether the host is currently connected.
    pub fn is_connected(&self) -> bool {
        self.read().is_connected()
    }

    /// The interface carrying the connection, `None` when offline.
    pub fn interface_type(&self) -> Option<InterfaceType> {
        self.read().interface_type()
    }

    /// Whether the first real event has been received.
    pub fn is_established(&self) -> bool {
        self.shared.state.lock().established
    }

    /// Whether [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.shared.state.lock().stopped
    }

    /// The live flag once established, otherwise the remembered one.
    pub fn last_known_connected(&self) -> bool {
        let (established, current) = {
            let state = self.shared.state.lock();
            (state.established, state.current)
        };
        if established {
            current.is_connected()
        } else {
            self.shared.memory.load()
        }
    }

    /// Subscribe to state transitions.
    ///
    /// Once the state is established the first element is the current
    /// snapshot; before that the subscription waits for the first real
    /// event. After [`stop`](Self::stop) the subscription is already complete.
    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();

        let state = self.shared.state.lock();
        if state.stopped {
            return Subscription { receiver };
        }

        let mut subscriber = Subscriber {
            sender,
            delivered: 0,
        };
        if state.established {
            // Receiver is alive, so the send cannot fail.
            let _ = subscriber.sender.send(state.current);
            subscriber.delivered = state.version;
        }
        self.shared.subscribers.lock().push(subscriber);
        drop(state);

        Subscription { receiver }
    }

    /// Subscribe to the connected flag only.
    pub fn subscribe_connected(&self) -> impl Stream<Item = bool> + Send + Unpin + use<> {
        self.subscribe().map(|state| state.is_connected())
    }

    /// The side-channel signal.
    pub fn changed(&self) -> &Signal<ReachabilityChanged> {
        &self.shared.changed
    }

    /// Connect a side-channel slot that runs on the shared dispatcher thread.
    pub fn on_changed<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&ReachabilityChanged) + Send + Sync + 'static,
    {
        self.shared.changed.connect_with_type(slot, ConnectionType::Queued)
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.shared.subscribers.lock();
        subscribers.retain(|s| !s.sender.is_closed());
        subscribers.len()
    }

    #[cfg(test)]
    fn ingest(&self, status: PathStatus) {
        self.shared.ingest(status);
    }
}

impl StoreShared {
    fn ingest(&self, status: PathStatus) {
        let next = ConnectionState::from_status(&status);

        let (accepted, version) = {
            let mut state = self.state.lock();
            if state.stopped {
                tracing::trace!(target: targets::STORE, "event after stop dropped");
                return;
            }

            if !state.established {
                state.established = true;
                state.current = next;
                state.version += 1;
                (Accepted::Established, state.version)
            } else if state.current.is_connected() != next.is_connected() {
                state.current = next;
                state.version += 1;
                (Accepted::Transition, state.version)
            } else {
                if state.current != next {
                    tracing::trace!(target: targets::STORE, state = %next, "interface changed without transition");
                }
                state.current = next;
                return;
            }
        };

        match accepted {
            Accepted::Established => {
                tracing::debug!(target: targets::STORE, state = %next, "initial state established");
            }
            Accepted::Transition => {
                tracing::debug!(target: targets::STORE, state = %next, "reachability changed");
            }
        }

        self.persist(next.is_connected());
        self.publish(next, version);

        if let Accepted::Transition = accepted {
            self.changed.emit(ReachabilityChanged {
                is_connected: next.is_connected(),
            });
        }
    }

    fn persist(&self, connected: bool) {
        if let Err(err) = self.memory.save(connected) {
            tracing::warn!(target: targets::MEMORY, error = %err, "failed to persist connection state");
        }
    }

    fn publish(&self, next: ConnectionState, version: u64) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain_mut(|subscriber| {
            if subscriber.delivered >= version {
                return !subscriber.sender.is_closed();
            }
            subscriber.delivered = version;
            subscriber.sender.send(next).is_ok()
        });
    }
}

impl Drop for StateStore {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("StateStore")
            .field("current", &state.current)
            .field("established", &state.established)
            .field("stopped", &state.stopped)
            .finish()
    }
}

/// A stream of [`ConnectionState`] transitions from a [`StateStore`].
///
/// Completes when the store is stopped or dropped.
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<ConnectionState>,
}

impl Subscription {
    /// Wait for the next element; `None` once the store is gone.
    pub async fn recv(&mut self) -> Option<ConnectionState> {
        self.receiver.recv().await
    }

    /// Take the next element if one is already queued.
    pub fn try_recv(&mut self) -> Option<ConnectionState> {
        self.receiver.try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = ConnectionState;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
