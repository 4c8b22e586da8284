//! Core systems for Reachability.
//!
//! This crate provides the building blocks the reachability observer is
//! assembled from. None of them know anything about networking:
//!
//! - **Signal/Slot System**: Type-safe broadcast side-channel
//! - **Dispatcher**: Named worker thread that runs queued slots in order
//! - **Settings**: Path-addressed key-value storage with JSON persistence
//! - **Logging**: `tracing` target names for every subsystem
//!
//! # Signal/Slot Example
//!
//! ```
//! use reachability_core::{ConnectionType, Signal};
//!
//! let value_changed = Signal::<i32>::new();
//!
//! // Runs on the emitting thread
//! value_changed.connect(|value| println!("direct: {}", value));
//!
//! // Runs on the shared dispatcher thread
//! value_changed.connect_with_type(|value| println!("queued: {}", value), ConnectionType::Queued);
//!
//! value_changed.emit(42);
//! ```

pub mod dispatcher;
mod error;
pub mod logging;
pub mod settings;
pub mod signal;

pub use dispatcher::Dispatcher;
pub use error::{CoreError, Result};
pub use settings::{FromSettingsValue, Settings, SettingsValue, SharedSettings};
pub use signal::{ConnectionGuard, ConnectionId, ConnectionType, Signal};
