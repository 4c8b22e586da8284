//! Logging facilities for Reachability.
//!
//! Reachability uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("reachability=debug")
//!         .init();
//! }
//! ```
//!
//! All events are emitted with one of the explicit targets below, so each
//! subsystem can be filtered independently.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Signal/slot system target.
    pub const SIGNAL: &str = "reachability_core::signal";
    /// Dispatcher thread target.
    pub const DISPATCHER: &str = "reachability_core::dispatcher";
    /// Settings storage target.
    pub const SETTINGS: &str = "reachability_core::settings";
    /// State store target.
    pub const STORE: &str = "reachability::store";
    /// Path source target (native watcher, manual source).
    pub const SOURCE: &str = "reachability::source";
    /// Fallback probe target.
    pub const PROBE: &str = "reachability::probe";
    /// Persisted memory target.
    pub const MEMORY: &str = "reachability::memory";
    /// Monitor construction and strategy selection target.
    pub const MONITOR: &str = "reachability::monitor";
}

