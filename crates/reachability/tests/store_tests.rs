//! Integration tests for the state store.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use futures_util::StreamExt;
use reachability::{
    ConnectionMemory, ConnectionState, InMemoryMemory, InterfaceTag, InterfaceType,
    ManualSource, ManualSourceHandle, MonitorBuilder, PathStatus, StateStore,
};

fn manual_store(memory: Arc<InMemoryMemory>) -> (StateStore, ManualSourceHandle) {
    let (source, handle) = ManualSource::new();
    let store = MonitorBuilder::new()
        .source(source)
        .memory(memory)
        .build()
        .expect("Failed to build store");
    (store, handle)
}

#[tokio::test]
async fn test_pending_subscriber_waits_for_real_state() {
    let (store, handle) = manual_store(Arc::new(InMemoryMemory::new(true)));
    let mut sub = store.subscribe();

    let waiter = tokio::spawn(async move { sub.recv().await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    handle.set_connected(false);
    let first = waiter.await.unwrap();
    assert_eq!(first, Some(ConnectionState::offline()));
}

#[tokio::test]
async fn test_transition_sequence_matches_reads() {
    let (store, handle) = manual_store(Arc::new(InMemoryMemory::default()));
    let store = Arc::new(store);
    let mut sub = store.subscribe();

    let sequence = [true, false, true, false, true];
    let producer = {
        let handle = handle.clone();
        thread::spawn(move || {
            for connected in sequence {
                handle.set_connected(connected);
                thread::sleep(Duration::from_millis(5));
            }
        })
    };

    let mut seen = Vec::new();
    while seen.len() < sequence.len() {
        let state = tokio::time::timeout(Duration::from_secs(5), sub.next())
            .await
            .expect("Timed out waiting for transition")
            .expect("Subscription ended early");
        seen.push(state.is_connected());
    }
    producer.join().unwrap();

    assert_eq!(seen, sequence);
    assert!(store.is_connected());
}

#[tokio::test]
async fn test_subscribe_connected_maps_to_bool() {
    let (store, handle) = manual_store(Arc::new(InMemoryMemory::default()));
    handle.send(PathStatus::satisfied([InterfaceTag::Cellular]));

    let mut flags = store.subscribe_connected();
    assert_eq!(flags.next().await, Some(true));

    store.stop();
    assert_eq!(flags.next().await, None);
}

#[test]
fn test_side_channel_counts_transitions_only() {
    let (store, handle) = manual_store(Arc::new(InMemoryMemory::default()));
    let fired = Arc::new(AtomicUsize::new(0));
    let fired_clone = fired.clone();
    store.changed().connect(move |_| {
        fired_clone.fetch_add(1, Ordering::SeqCst);
    });

    handle.set_connected(true);
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    handle.set_connected(true);
    handle.set_connected(false);
    handle.set_connected(false);
    handle.set_connected(true);
    assert_eq!(fired.load(Ordering::SeqCst), 2);
}

#[test]
fn test_queued_side_channel_runs_on_dispatcher() {
    let (store, handle) = manual_store(Arc::new(InMemoryMemory::default()));
    let (tx, rx) = std::sync::mpsc::channel();
    store.on_changed(move |change| {
        let _ = tx.send((change.is_connected, thread::current().name().map(str::to_string)));
    });

    handle.set_connected(false);
    handle.set_connected(true);

    let (connected, thread_name) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(connected);
    assert_eq!(thread_name.as_deref(), Some("reachability-dispatcher"));
}

#[test]
fn test_memory_tracks_accepted_states() {
    let memory = Arc::new(InMemoryMemory::new(false));
    let (store, handle) = manual_store(memory.clone());

    handle.set_connected(true);
    assert!(memory.load());
    assert!(store.is_connected());

    handle.set_connected(false);
    assert!(!memory.load());
}

#[test]
fn test_concurrent_reads_are_never_torn() {
    let (store, handle) = manual_store(Arc::new(InMemoryMemory::default()));
    let store = Arc::new(store);

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            thread::spawn(move || {
                for _ in 0..2_000 {
                    let state = store.read();
                    assert_eq!(state.is_connected(), state.interface_type().is_some());
                }
            })
        })
        .collect();

    for i in 0..=500 {
        let status = match i % 3 {
            0 => PathStatus::satisfied([InterfaceTag::Wifi]),
            1 => PathStatus::unsatisfied(),
            _ => PathStatus::satisfied([InterfaceTag::WiredEthernet]),
        };
        handle.send(status);
    }

    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(store.interface_type(), Some(InterfaceType::WiredEthernet));
}

#[tokio::test]
async fn test_stop_from_another_thread() {
    let (store, handle) = manual_store(Arc::new(InMemoryMemory::default()));
    let store = Arc::new(store);
    handle.set_connected(true);
    let mut sub = store.subscribe();
    assert_eq!(sub.recv().await.map(|s| s.is_connected()), Some(true));

    let stopper = {
        let store = store.clone();
        thread::spawn(move || store.stop())
    };
    stopper.join().unwrap();

    assert_eq!(sub.recv().await, None);
    assert!(!handle.set_connected(false));
    assert!(store.is_connected());
}
