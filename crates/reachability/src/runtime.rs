//! Runtime management for async probe tasks.
//!
//! The fallback probe runs on the caller's tokio runtime when there is one.
//! Otherwise a small shared runtime is created on first use and kept for the
//! rest of the process.

use std::sync::OnceLock;

use tokio::runtime::{Builder, Handle, Runtime};

use crate::error::{ReachabilityError, Result};

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// A handle to the current runtime, or to the shared fallback runtime.
pub fn handle() -> Result<Handle> {
    if let Ok(handle) = Handle::try_current() {
        return Ok(handle);
    }
    if let Some(runtime) = RUNTIME.get() {
        return Ok(runtime.handle().clone());
    }

    let runtime = Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("reachability-probe")
        .enable_all()
        .build()
        .map_err(|e| ReachabilityError::Runtime(e.to_string()))?;

    // Another thread may have won the race; its runtime is kept and ours dropped.
    let _ = RUNTIME.set(runtime);
    RUNTIME
        .get()
        .map(|runtime| runtime.handle().clone())
        .ok_or_else(|| ReachabilityError::Runtime("shared runtime not initialized".to_string()))
}
