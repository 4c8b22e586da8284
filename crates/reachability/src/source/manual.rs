//! Hand-driven path source for tests.

use std::sync::Arc;

use parking_lot::Mutex;
use reachability_core::logging::targets;

use super::{PathCallback, PathSource};
use crate::error::Result;
use crate::state::{InterfaceTag, PathStatus};

/// A [`PathSource`] whose events are pushed through a [`ManualSourceHandle`].
///
/// ```
/// use reachability::source::ManualSource;
///
/// let (source, handle) = ManualSource::new();
/// // hand `source` to a store, then drive it:
/// handle.set_connected(true);
/// # drop(source);
/// ```
pub struct ManualSource {
    slot: Arc<Mutex<Option<PathCallback>>>,
}

/// Sends events into a started [`ManualSource`].
///
/// Events sent while the source is not started are dropped.
#[derive(Clone)]
pub struct ManualSourceHandle {
    slot: Arc<Mutex<Option<PathCallback>>>,
}

impl ManualSource {
    /// Create a source and the handle that drives it.
    pub fn new() -> (Self, ManualSourceHandle) {
        let slot = Arc::new(Mutex::new(None));
        (
            Self { slot: slot.clone() },
            ManualSourceHandle { slot },
        )
    }
}

impl PathSource for ManualSource {
    fn name(&self) -> &'static str {
        "manual"
    }

    fn start(&mut self, callback: PathCallback) -> Result<()> {
        *self.slot.lock() = Some(callback);
        Ok(())
    }

    fn stop(&mut self) {
        self.slot.lock().take();
    }
}

impl ManualSourceHandle {
    /// Deliver `status` synchronously on the calling thread.
    ///
    /// Returns `false` if the source was not started.
    pub fn send(&self, status: PathStatus) -> bool {
        // Clone out so the callback runs without holding the slot lock.
        let callback = self.slot.lock().clone();
        match callback {
            Some(callback) => {
                callback(status);
                true
            }
            None => {
                tracing::trace!(target: targets::SOURCE, "manual source not started, event dropped");
                false
            }
        }
    }

    /// Deliver a WiFi-backed satisfied event, or an unsatisfied one.
    pub fn set_connected(&self, connected: bool) -> bool {
        if connected {
            self.send(PathStatus::satisfied([InterfaceTag::Wifi]))
        } else {
            self.send(PathStatus::unsatisfied())
        }
    }

    /// Whether the source currently has a registered callback.
    pub fn is_started(&self) -> bool {
        self.slot.lock().is_some()
    }
}
