//! Building state stores from configuration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reachability_core::logging::targets;
use tokio::runtime::Handle;

use crate::config::{MonitorConfig, SourceStrategy, duration_ms};
use crate::error::Result;
use crate::memory::{ConnectionMemory, SettingsMemory, default_settings_path};
use crate::probe::{HttpHeadCheck, ReachabilityCheck};
use crate::source::{FallbackProbe, NativePathSource, PathCallback, PathSource};
use crate::store::StateStore;

/// Builder for a [`StateStore`].
///
/// ```no_run
/// use reachability::{MonitorBuilder, SourceStrategy};
/// use std::time::Duration;
///
/// let store = MonitorBuilder::new()
///     .strategy(SourceStrategy::Polling)
///     .probe_interval(Duration::from_secs(5))
///     .build()?;
/// println!("online: {}", store.is_connected());
/// # Ok::<(), reachability::ReachabilityError>(())
/// ```
pub struct MonitorBuilder {
    config: MonitorConfig,
    memory: Option<Arc<dyn ConnectionMemory>>,
    source: Option<Box<dyn PathSource>>,
    check: Option<Arc<dyn ReachabilityCheck>>,
    runtime: Option<Handle>,
}

impl Default for MonitorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorBuilder {
    /// A builder with the default configuration.
    pub fn new() -> Self {
        Self::from_config(MonitorConfig::default())
    }

    /// A builder starting from `config`.
    pub fn from_config(config: MonitorConfig) -> Self {
        Self {
            config,
            memory: None,
            source: None,
            check: None,
            runtime: None,
        }
    }

    /// Whether to start the source in [`build`](Self::build).
    pub fn auto_start(mut self, auto_start: bool) -> Self {
        self.config.auto_start = auto_start;
        self
    }

    /// Set the source strategy.
    pub fn strategy(mut self, strategy: SourceStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Set the polling interval.
    pub fn probe_interval(mut self, interval: Duration) -> Self {
        self.config.probe_interval_ms = duration_ms(interval);
        self
    }

    /// Set the per-check timeout.
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout_ms = duration_ms(timeout);
        self
    }

    /// Set the URL of the default HTTP probe.
    pub fn probe_url(mut self, url: impl Into<String>) -> Self {
        self.config.probe_url = url.into();
        self
    }

    /// Name of the per-user data directory holding the default settings file.
    pub fn application(mut self, application: impl Into<String>) -> Self {
        self.config.application = application.into();
        self
    }

    /// Persist the remembered flag to a JSON settings file.
    pub fn settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.settings_path = Some(path.into());
        self
    }

    /// Use a custom memory instead of the settings-backed one.
    pub fn memory(mut self, memory: Arc<dyn ConnectionMemory>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Use a custom source; the strategy is ignored.
    pub fn source(mut self, source: impl PathSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Use a custom check for the polling fallback.
    pub fn check(mut self, check: Arc<dyn ReachabilityCheck>) -> Self {
        self.check = Some(check);
        self
    }

    /// Run the polling fallback on `runtime`.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// The configuration as currently set.
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Build the store, starting it if `auto_start` is set.
    pub fn build(self) -> Result<StateStore> {
        let memory = match self.memory {
            Some(memory) => memory,
            None => default_memory(&self.config),
        };
        let source = match self.source {
            Some(source) => source,
            None => select_source(&self.config, self.check, self.runtime)?,
        };

        tracing::debug!(
            target: targets::MONITOR,
            source = source.name(),
            auto_start = self.config.auto_start,
            "building state store"
        );
        let store = StateStore::new(source, memory);
        if self.config.auto_start {
            store.start()?;
        }
        Ok(store)
    }
}

fn default_memory(config: &MonitorConfig) -> Arc<dyn ConnectionMemory> {
    let path = config
        .settings_path
        .clone()
        .or_else(|| default_settings_path(&config.application));

    let memory = match path {
        Some(path) => {
            tracing::debug!(target: targets::MEMORY, path = %path.display(), "using settings file");
            SettingsMemory::open_json(&path, &config.storage_namespace, &config.storage_key)
        }
        None => {
            tracing::warn!(
                target: targets::MEMORY,
                "no per-user data directory, remembered state will not persist"
            );
            SettingsMemory::new(
                Arc::new(reachability_core::Settings::new()),
                &config.storage_namespace,
                &config.storage_key,
            )
        }
    };
    Arc::new(memory)
}

fn select_source(
    config: &MonitorConfig,
    check: Option<Arc<dyn ReachabilityCheck>>,
    runtime: Option<Handle>,
) -> Result<Box<dyn PathSource>> {
    let probe = |check: Option<Arc<dyn ReachabilityCheck>>| -> Result<FallbackProbe> {
        let check = match check {
            Some(check) => check,
            None => Arc::new(HttpHeadCheck::new(
                config.probe_url.clone(),
                Duration::from_millis(config.probe_timeout_ms),
            )?),
        };
        let probe = FallbackProbe::new(check, config.probe_settings());
        Ok(match runtime.clone() {
            Some(handle) => probe.with_runtime(handle),
            None => probe,
        })
    };

    let source: Box<dyn PathSource> = match config.strategy {
        SourceStrategy::Native => Box::new(NativePathSource::new()),
        SourceStrategy::Polling => Box::new(probe(check)?),
        SourceStrategy::Auto => Box::new(AutoSource::new(
            Box::new(NativePathSource::new()),
            Box::new(probe(check)?),
        )),
    };
    Ok(source)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Active {
    Primary,
    Fallback,
}

/// Starts the primary source, or the fallback if the primary fails to start.
///
/// At most one of the two is ever registered.
struct AutoSource {
    primary: Box<dyn PathSource>,
    fallback: Box<dyn PathSource>,
    active: Option<Active>,
}

impl AutoSource {
    fn new(primary: Box<dyn PathSource>, fallback: Box<dyn PathSource>) -> Self {
        Self {
            primary,
            fallback,
            active: None,
        }
    }
}

impl PathSource for AutoSource {
    fn name(&self) -> &'static str {
        match self.active {
            Some(Active::Primary) => self.primary.name(),
            Some(Active::Fallback) => self.fallback.name(),
            None => "auto",
        }
    }

    fn start(&mut self, callback: PathCallback) -> Result<()> {
        if self.active.is_some() {
            return Ok(());
        }
        match self.primary.start(callback.clone()) {
            Ok(()) => {
                self.active = Some(Active::Primary);
            }
            Err(err) => {
                tracing::warn!(
                    target: targets::MONITOR,
                    source = self.primary.name(),
                    error = %err,
                    "native source unavailable, degrading to polling"
                );
                self.primary.stop();
                self.fallback.start(callback)?;
                self.active = Some(Active::Fallback);
            }
        }
        Ok(())
    }

    fn stop(&mut self) {
        match self.active.take() {
            Some(Active::Primary) => self.primary.stop(),
            Some(Active::Fallback) => self.fallback.stop(),
            None => {}
        }
    }
}
