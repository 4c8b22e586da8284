//! Monitor configuration.
//!
//! Every field has a default, so an empty document is a valid configuration:
//!
//! ```toml
//! strategy = "polling"
//! probe_interval_ms = 5000
//! probe_url = "https://example.com/health"
//! settings_path = "state/reachability.json"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ReachabilityError, Result};
use crate::memory::{DEFAULT_APPLICATION, DEFAULT_KEY, DEFAULT_NAMESPACE};
use crate::probe::{DEFAULT_PROBE_TIMEOUT, DEFAULT_PROBE_URL};
use crate::source::{DEFAULT_PROBE_INTERVAL, ProbeSettings};

/// Which path source a monitor uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStrategy {
    /// Native notifications, degrading to polling if they cannot start.
    #[default]
    Auto,
    /// Native notifications only; failing to start is an error.
    Native,
    /// Periodic active checks only.
    Polling,
}

/// Settings for building a monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Start the source as soon as the monitor is built.
    pub auto_start: bool,
    /// Source selection.
    pub strategy: SourceStrategy,
    /// Delay between probe checks.
    pub probe_interval_ms: u64,
    /// Upper bound on a single probe check.
    pub probe_timeout_ms: u64,
    /// Endpoint for the HTTP probe.
    pub probe_url: String,
    /// Settings namespace of the remembered flag.
    pub storage_namespace: String,
    /// Settings key of the remembered flag.
    pub storage_key: String,
    /// Application name that locates the per-user data directory.
    pub application: String,
    /// JSON file backing the remembered flag.
    ///
    /// Defaults to a file in the per-user data directory of `application`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings_path: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            auto_start: true,
            strategy: SourceStrategy::Auto,
            probe_interval_ms: duration_ms(DEFAULT_PROBE_INTERVAL),
            probe_timeout_ms: duration_ms(DEFAULT_PROBE_TIMEOUT),
            probe_url: DEFAULT_PROBE_URL.to_string(),
            storage_namespace: DEFAULT_NAMESPACE.to_string(),
            storage_key: DEFAULT_KEY.to_string(),
            application: DEFAULT_APPLICATION.to_string(),
            settings_path: None,
        }
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl MonitorConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Parse a JSON document.
    pub fn from_json_str(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Read and parse a TOML file.
    pub fn load_toml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ReachabilityError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Probe timing derived from the millisecond fields.
    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            interval: Duration::from_millis(self.probe_interval_ms),
            timeout: Duration::from_millis(self.probe_timeout_ms),
        }
    }
}
