//! Default memory location tests.
//!
//! Kept in its own test binary because it points the per-user data
//! directory at a temporary one through the environment.

#![cfg(target_os = "linux")]

use reachability::memory::{DEFAULT_APPLICATION, default_settings_path};
use reachability::{ManualSource, MonitorBuilder};
use tempfile::tempdir;

fn default_store() -> (reachability::StateStore, reachability::ManualSourceHandle) {
    let (source, handle) = ManualSource::new();
    let store = MonitorBuilder::new()
        .source(source)
        .build()
        .expect("Failed to build store");
    (store, handle)
}

#[test]
fn test_default_store_remembers_across_restart() {
    let data_home = tempdir().unwrap();
    // Only test in this binary, so nothing else reads the environment concurrently.
    unsafe { std::env::set_var("XDG_DATA_HOME", data_home.path()) };

    let Some(path) = default_settings_path(DEFAULT_APPLICATION) else {
        return;
    };
    assert!(path.starts_with(data_home.path()));

    let (first, handle) = default_store();
    handle.set_connected(true);
    drop(first);
    assert!(path.exists());

    let (second, _handle) = default_store();
    assert!(!second.is_established());
    assert!(second.last_known_connected());
}
