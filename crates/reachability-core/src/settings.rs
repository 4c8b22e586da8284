//! Persistent key-value settings.
//!
//! A small hierarchical settings store addressed by path keys. Paths can use
//! either "." or "/" as separators, so `"reachability.isConnected"` and
//! `"reachability/isConnected"` name the same entry.
//!
//! ```
//! use reachability_core::Settings;
//!
//! let settings = Settings::new();
//! settings.set("reachability.isConnected", true);
//! assert_eq!(settings.get::<bool>("reachability/isConnected"), Some(true));
//! assert_eq!(settings.get_or("reachability.missing", false), false);
//! ```
//!
//! Settings can be written to a JSON file explicitly with
//! [`Settings::save_json`], or after every change once auto-save is enabled
//! with [`Settings::set_auto_save`]. Files are written atomically through a
//! temporary sibling file and a rename.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::logging::targets;

/// A value that can be stored in settings.
///
/// Only booleans are written through [`Settings::set`]; the other variants
/// let a shared file keep entries owned by the rest of an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum SettingsValue {
    /// A null/empty value.
    #[default]
    Null,
    /// A boolean value.
    Bool(bool),
    /// A 64-bit signed integer.
    Integer(i64),
    /// A 64-bit floating point number.
    Float(f64),
    /// A string value.
    String(String),
    /// An array of values.
    Array(Vec<SettingsValue>),
    /// A nested object/table.
    Object(HashMap<String, SettingsValue>),
}

impl From<bool> for SettingsValue {
    fn from(v: bool) -> Self {
        SettingsValue::Bool(v)
    }
}

/// Conversion out of a stored [`SettingsValue`].
pub trait FromSettingsValue: Sized {
    /// Convert the value, or return `None` on a type mismatch.
    fn from_settings_value(value: &SettingsValue) -> Option<Self>;
}

impl FromSettingsValue for bool {
    fn from_settings_value(value: &SettingsValue) -> Option<Self> {
        match value {
            SettingsValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

/// A hierarchical key-value settings store.
///
/// All operations take `&self`; the store is meant to be shared through
/// [`SharedSettings`].
pub struct Settings {
    data: RwLock<HashMap<String, SettingsValue>>,
    auto_save: RwLock<Option<PathBuf>>,
}

/// A thread-safe, reference-counted settings store.
pub type SharedSettings = Arc<Settings>;

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    /// Creates a new empty settings store.
    pub fn new() -> Self {
        Self::from_data(HashMap::new())
    }

    fn from_data(data: HashMap<String, SettingsValue>) -> Self {
        Self {
            data: RwLock::new(data),
            auto_save: RwLock::new(None),
        }
    }

    /// Loads settings from `path` and enables auto-save to it.
    ///
    /// A missing file starts empty. An unreadable or malformed file is
    /// logged and also starts empty; the next write replaces it.
    pub fn open_json(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let settings = if path.exists() {
            match Self::load_json(path) {
                Ok(settings) => settings,
                Err(err) => {
                    tracing::warn!(
                        target: targets::SETTINGS,
                        path = %path.display(),
                        error = %err,
                        "discarding unreadable settings file"
                    );
                    Self::new()
                }
            }
        } else {
            Self::new()
        };
        settings.set_auto_save(path);
        settings
    }

    /// Enables auto-save to the specified JSON file.
    pub fn set_auto_save(&self, path: impl AsRef<Path>) {
        *self.auto_save.write() = Some(path.as_ref().to_path_buf());
    }

    /// Returns true if auto-save is enabled.
    pub fn is_auto_save_enabled(&self) -> bool {
        self.auto_save.read().is_some()
    }

    /// Sets a value at the specified path, creating intermediate objects.
    ///
    /// When auto-save is enabled the write is persisted before returning.
    pub fn set<V: Into<SettingsValue>>(&self, path: &str, value: V) -> Result<()> {
        let parts = Self::parse_path(path);
        if parts.is_empty() {
            return Ok(());
        }

        {
            let mut data = self.data.write();
            Self::set_nested(&mut data, &parts, value.into());
        }

        self.sync()
    }

    /// Gets a value at the specified path.
    pub fn get<T: FromSettingsValue>(&self, path: &str) -> Option<T> {
        let data = self.data.read();
        let parts = Self::parse_path(path);
        Self::get_nested(&data, &parts).and_then(T::from_settings_value)
    }

    /// Gets a value at the specified path, or returns the default.
    pub fn get_or<T: FromSettingsValue>(&self, path: &str, default: T) -> T {
        self.get(path).unwrap_or(default)
    }

    /// Returns true if a value exists at the specified path.
    pub fn contains(&self, path: &str) -> bool {
        let data = self.data.read();
        let parts = Self::parse_path(path);
        Self::get_nested(&data, &parts).is_some()
    }

    /// Returns true if there are no settings.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Loads settings from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| CoreError::settings_io(path, e))?;
        let data: HashMap<String, SettingsValue> =
            serde_json::from_str(&content).map_err(|e| CoreError::settings_format(path, e))?;
        Ok(Self::from_data(data))
    }

    /// Saves settings to a JSON file atomically.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = {
            let data = self.data.read();
            serde_json::to_string_pretty(&*data).map_err(|e| CoreError::settings_format(path, e))?
        };
        atomic_write(path, json.as_bytes())
    }

    /// Writes settings to the auto-save file, if one is configured.
    pub fn sync(&self) -> Result<()> {
        let path = self.auto_save.read().clone();
        match path {
            Some(path) => {
                let result = self.save_json(&path);
                if let Err(e) = &result {
                    tracing::error!(target: targets::SETTINGS, path = %path.display(), "failed to auto-save settings: {e}");
                }
                result
            }
            None => Ok(()),
        }
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn parse_path(path: &str) -> Vec<&str> {
        path.split(['.', '/']).filter(|s| !s.is_empty()).collect()
    }

    fn get_nested<'a>(
        data: &'a HashMap<String, SettingsValue>,
        parts: &[&str],
    ) -> Option<&'a SettingsValue> {
        let (first, rest) = parts.split_first()?;
        let value = data.get(*first)?;
        if rest.is_empty() {
            Some(value)
        } else {
            match value {
                SettingsValue::Object(obj) => Self::get_nested(obj, rest),
                _ => None,
            }
        }
    }

    fn set_nested(data: &mut HashMap<String, SettingsValue>, parts: &[&str], value: SettingsValue) {
        let Some((first, rest)) = parts.split_first() else {
            return;
        };

        if rest.is_empty() {
            data.insert(first.to_string(), value);
            return;
        }

        let entry = data
            .entry(first.to_string())
            .or_insert_with(|| SettingsValue::Object(HashMap::new()));
        if !matches!(entry, SettingsValue::Object(_)) {
            // Replace non-object with object
            *entry = SettingsValue::Object(HashMap::new());
        }
        if let SettingsValue::Object(obj) = entry {
            Self::set_nested(obj, rest, value);
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("entries", &self.data.read().len())
            .field("auto_save", &*self.auto_save.read())
            .finish()
    }
}

/// Write `bytes` to `path` via a temporary file in the same directory.
fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| CoreError::settings_io(path, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "settings".to_string());
    let temp_path = parent.join(format!(".{}.tmp.{}", file_name, std::process::id()));

    let write = || -> std::io::Result<()> {
        let mut file = std::fs::File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        std::fs::rename(&temp_path, path)
    };

    write().map_err(|e| {
        std::fs::remove_file(&temp_path).ok();
        CoreError::settings_io(path, e)
    })
}
