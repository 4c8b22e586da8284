//! Raw path-event sources.
//!
//! A [`PathSource`] reports [`PathStatus`] events to a single callback,
//! asynchronously and from its own execution context. Exactly one source
//! feeds a state store.
//!
//! - [`NativePathSource`]: OS interface notifications via `netwatcher`
//! - [`FallbackProbe`]: periodic active reachability checks, for hosts where
//!   the native notifications are unreliable
//! - [`ManualSource`]: a test double driven by hand

mod fallback;
mod manual;
mod native;

use std::sync::Arc;

pub use fallback::{DEFAULT_PROBE_INTERVAL, FallbackProbe, ProbeSettings};
pub use manual::{ManualSource, ManualSourceHandle};
pub use native::{NativePathSource, snapshot_status};

use crate::error::Result;
use crate::state::PathStatus;

/// Callback registered with a [`PathSource`].
pub type PathCallback = Arc<dyn Fn(PathStatus) + Send + Sync>;

/// A push source of raw path events.
pub trait PathSource: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Begin delivering events to `callback`.
    ///
    /// The first event may arrive at any time after this returns, or before
    /// it returns from another thread.
    fn start(&mut self, callback: PathCallback) -> Result<()>;

    /// Stop delivering events and release the callback.
    ///
    /// Must be idempotent.
    fn stop(&mut self);
}
