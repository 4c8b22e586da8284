//! Persisted "last known" connection state.
//!
//! The memory is a record of the most recent state, for use before any live
//! source has reported. The state store only ever writes to it; a remembered
//! value never overrides a live detection.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use directories::ProjectDirs;
use reachability_core::{Settings, SharedSettings};

use crate::error::Result;

/// Default settings namespace for the persisted flag.
pub const DEFAULT_NAMESPACE: &str = "reachability";

/// Default key of the persisted flag inside its namespace.
pub const DEFAULT_KEY: &str = "isConnected";

/// Default application name used to locate the per-user data directory.
pub const DEFAULT_APPLICATION: &str = "reachability";

const SETTINGS_FILE_NAME: &str = "reachability.json";

/// The settings file for `application` in the per-user data directory.
///
/// `None` when the platform has no home directory to resolve it against.
pub fn default_settings_path(application: &str) -> Option<PathBuf> {
    ProjectDirs::from("", "", application).map(|dirs| dirs.data_dir().join(SETTINGS_FILE_NAME))
}

/// Storage for the last known connected flag.
///
/// Implementations must be cheap to call and tolerate concurrent use; the
/// same memory may be shared by several stores (last write wins).
pub trait ConnectionMemory: Send + Sync {
    /// The remembered flag, `false` if it was never written.
    fn load(&self) -> bool;

    /// Remember `connected`.
    fn save(&self, connected: bool) -> Result<()>;
}

/// A [`ConnectionMemory`] that lives only as long as the process.
#[derive(Debug, Default)]
pub struct InMemoryMemory {
    value: AtomicBool,
}

impl InMemoryMemory {
    /// Create a memory seeded with `connected`.
    pub fn new(connected: bool) -> Self {
        Self {
            value: AtomicBool::new(connected),
        }
    }
}

impl ConnectionMemory for InMemoryMemory {
    fn load(&self) -> bool {
        self.value.load(Ordering::SeqCst)
    }

    fn save(&self, connected: bool) -> Result<()> {
        self.value.store(connected, Ordering::SeqCst);
        Ok(())
    }
}

/// A [`ConnectionMemory`] backed by a shared [`Settings`] store.
///
/// The flag is stored at `<namespace>.<key>`.
#[derive(Debug, Clone)]
pub struct SettingsMemory {
    settings: SharedSettings,
    path: String,
}

impl SettingsMemory {
    /// Store the flag in `settings` under `namespace` and `key`.
    pub fn new(settings: SharedSettings, namespace: &str, key: &str) -> Self {
        let path = if namespace.is_empty() {
            key.to_string()
        } else {
            format!("{namespace}.{key}")
        };
        Self { settings, path }
    }

    /// A process-local settings store with the default namespace and key.
    pub fn in_process() -> Self {
        Self::new(Arc::new(Settings::new()), DEFAULT_NAMESPACE, DEFAULT_KEY)
    }

    /// Open (or create) a JSON settings file and auto-save every write to it.
    ///
    /// A malformed file is logged and treated as empty.
    pub fn open_json(path: impl AsRef<Path>, namespace: &str, key: &str) -> Self {
        Self::new(Arc::new(Settings::open_json(path)), namespace, key)
    }

    /// The full settings path of the persisted flag.
    pub fn key_path(&self) -> &str {
        &self.path
    }

    /// The underlying settings store.
    pub fn settings(&self) -> &SharedSettings {
        &self.settings
    }
}

impl ConnectionMemory for SettingsMemory {
    fn load(&self) -> bool {
        self.settings.get_or(&self.path, false)
    }

    fn save(&self, connected: bool) -> Result<()> {
        self.settings.set(&self.path, connected)?;
        Ok(())
    }
}
