//! Error types for Reachability core systems.

use std::path::PathBuf;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors produced by the core building blocks.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Reading or writing a settings file failed.
    #[error("Settings I/O error for '{path}': {source}")]
    SettingsIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Settings content could not be encoded or decoded.
    #[error("Invalid settings data in '{path}': {message}")]
    SettingsFormat { path: PathBuf, message: String },

    /// The dispatcher thread has exited and no longer accepts work.
    #[error("Dispatcher '{0}' has shut down")]
    DispatcherClosed(String),

    /// The dispatcher thread could not be spawned.
    #[error("Failed to spawn dispatcher thread: {0}")]
    DispatcherSpawn(#[source] std::io::Error),
}

impl CoreError {
    /// Create a settings I/O error.
    pub fn settings_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::SettingsIo {
            path: path.into(),
            source,
        }
    }

    /// Create a settings format error.
    pub fn settings_format(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::SettingsFormat {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
