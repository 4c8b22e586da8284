//! Error types for the reachability observer.
//!
//! Only construction-time operations return these errors. Once a store is
//! running, every failure resolves to a valid connection state instead.

use std::path::PathBuf;

/// Errors that can occur while configuring or starting an observer.
#[derive(Debug, thiserror::Error)]
pub enum ReachabilityError {
    /// The native path watcher could not be started.
    #[error("Failed to start network watcher: {0}")]
    Watcher(String),

    /// No tokio runtime was available and none could be created.
    #[error("Async runtime unavailable: {0}")]
    Runtime(String),

    /// The HTTP client for the fallback probe could not be built.
    #[error("Failed to build probe client: {0}")]
    ProbeClient(#[from] reqwest::Error),

    /// A configuration file could not be read.
    #[error("Failed to read config '{path}': {source}")]
    ConfigIo {
        /// The file that was being read.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A configuration document could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The settings store backing the default memory failed.
    #[error(transparent)]
    Settings(#[from] reachability_core::CoreError),
}

impl From<toml::de::Error> for ReachabilityError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ReachabilityError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// A specialized Result type for reachability operations.
pub type Result<T> = std::result::Result<T, ReachabilityError>;
