//! Network reachability observer.
//!
//! This crate tracks whether the host has outbound connectivity and which
//! kind of interface carries it:
//!
//! - **State**: [`ConnectionState`] snapshots, readable from any thread
//! - **Streams**: ordered [`Subscription`]s of accepted transitions
//! - **Side-channel**: a [`Signal`] fired on every transition after startup
//! - **Memory**: the last known flag, persisted through [`ConnectionMemory`]
//!
//! Raw events come from a single [`PathSource`]: OS interface notifications
//! where they work, or a polling [`FallbackProbe`] where they do not.
//!
//! # Example
//!
//! ```no_run
//! use reachability::MonitorBuilder;
//! use futures_util::StreamExt;
//!
//! # async fn run() -> reachability::Result<()> {
//! let store = MonitorBuilder::new()
//!     .settings_path("reachability.json")
//!     .build()?;
//!
//! let mut changes = store.subscribe();
//! while let Some(state) = changes.next().await {
//!     println!("now {state}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Side-channel
//!
//! The first reported state is an initialization, not a change, so only
//! later transitions reach [`StateStore::changed`]. Use
//! [`StateStore::on_changed`] to receive them on the shared dispatcher
//! thread instead of the source's own context:
//!
//! ```no_run
//! # let store = reachability::MonitorBuilder::new().build().unwrap();
//! store.on_changed(|change| {
//!     println!("connected: {}", change.is_connected);
//! });
//! ```

pub mod config;
mod error;
pub mod memory;
pub mod monitor;
pub mod observer;
pub mod probe;
pub mod runtime;
pub mod source;
pub mod state;
pub mod store;

pub use config::{MonitorConfig, SourceStrategy};
pub use error::{ReachabilityError, Result};
pub use memory::{ConnectionMemory, InMemoryMemory, SettingsMemory};
pub use monitor::MonitorBuilder;
pub use observer::{MockObserver, NetworkObserver};
pub use probe::{HttpHeadCheck, ReachabilityCheck, TcpConnectCheck};
pub use source::{FallbackProbe, ManualSource, ManualSourceHandle, NativePathSource, PathSource, ProbeSettings};
pub use state::{ConnectionState, InterfaceTag, InterfaceType, PathStatus, classify};
pub use store::{ReachabilityChanged, StateStore, Subscription};

pub use reachability_core::Signal;
