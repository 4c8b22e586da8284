//! Polling fallback for hosts with unreliable native path notifications.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reachability_core::logging::targets;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{PathCallback, PathSource};
use crate::error::Result;
use crate::probe::{DEFAULT_PROBE_TIMEOUT, ReachabilityCheck};
use crate::state::{InterfaceTag, PathStatus};

/// Default interval between probe checks.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(2);

const MIN_PROBE_INTERVAL: Duration = Duration::from_millis(10);

/// Timing of the fallback probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Delay between the start of consecutive checks.
    pub interval: Duration,
    /// Upper bound on a single check; exceeding it counts as offline.
    pub timeout: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_PROBE_INTERVAL,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

/// A [`PathSource`] that synthesizes events from periodic checks.
///
/// The first check runs immediately on [`start`](PathSource::start), then
/// once per interval. The interface type cannot be observed this way, so a
/// reachable host is always reported as WiFi.
pub struct FallbackProbe {
    check: Arc<dyn ReachabilityCheck>,
    settings: ProbeSettings,
    runtime: Option<Handle>,
    task: Option<ProbeTask>,
}

struct ProbeTask {
    cancel_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
    /// Cleared by `stop`; a check that finishes afterwards is discarded.
    engaged: Arc<AtomicBool>,
}

impl FallbackProbe {
    /// Create an idle probe around `check`.
    pub fn new(check: Arc<dyn ReachabilityCheck>, settings: ProbeSettings) -> Self {
        Self {
            check,
            settings,
            runtime: None,
            task: None,
        }
    }

    /// Spawn the probe task on `runtime` instead of the ambient one.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// The probe timing.
    pub fn settings(&self) -> ProbeSettings {
        self.settings
    }

    /// Whether the probe task is active.
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }
}

/// The synthetic event for a check outcome.
pub(crate) fn probe_status(reachable: bool) -> PathStatus {
    if reachable {
        PathStatus::satisfied([InterfaceTag::Wifi])
    } else {
        PathStatus::unsatisfied()
    }
}

impl PathSource for FallbackProbe {
    fn name(&self) -> &'static str {
        "fallback-probe"
    }

    fn start(&mut self, callback: PathCallback) -> Result<()> {
        if self.task.is_some() {
            return Ok(());
        }

        let runtime = match &self.runtime {
            Some(handle) => handle.clone(),
            None => crate::runtime::handle()?,
        };
        let check = self.check.clone();
        let interval = self.settings.interval.max(MIN_PROBE_INTERVAL);
        let timeout = self.settings.timeout;
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let engaged = Arc::new(AtomicBool::new(true));
        let task_engaged = engaged.clone();

        let join = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut cancel_rx => break,
                    _ = ticker.tick() => {
                        let reachable = tokio::time::timeout(timeout, check.check())
                            .await
                            .unwrap_or(false);
                        if !task_engaged.load(Ordering::SeqCst) {
                            tracing::trace!(target: targets::PROBE, "check finished after stop, discarded");
                            break;
                        }
                        tracing::trace!(target: targets::PROBE, reachable, "probe check finished");
                        callback(probe_status(reachable));
                    }
                }
            }
            tracing::debug!(target: targets::PROBE, "probe task exited");
        });

        tracing::debug!(target: targets::PROBE, ?interval, ?timeout, "fallback probe started");
        self.task = Some(ProbeTask {
            cancel_tx,
            join,
            engaged,
        });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.engaged.store(false, Ordering::SeqCst);
            let _ = task.cancel_tx.send(());
            // Also interrupts a check that is still in flight.
            task.join.abort();
            tracing::debug!(target: targets::PROBE, "fallback probe stopped");
        }
    }
}

impl Drop for FallbackProbe {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ConnectionState, InterfaceType};
    use futures_util::future::BoxFuture;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedCheck(bool);

    impl ReachabilityCheck for FixedCheck {
        fn check(&self) -> BoxFuture<'_, bool> {
            Box::pin(async move { self.0 })
        }
    }

    struct HangingCheck;

    impl ReachabilityCheck for HangingCheck {
        fn check(&self) -> BoxFuture<'_, bool> {
            Box::pin(std::future::pending())
        }
    }

    fn collector() -> (PathCallback, Arc<Mutex<Vec<PathStatus>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = events.clone();
        let callback: PathCallback = Arc::new(move |status| events_clone.lock().push(status));
        (callback, events)
    }

    #[test]
    fn test_probe_status_classification() {
        let online = ConnectionState::from_status(&probe_status(true));
        assert_eq!(online.interface_type(), Some(InterfaceType::Wifi));

        let offline = ConnectionState::from_status(&probe_status(false));
        assert!(!offline.is_connected());
        assert_eq!(offline.interface_type(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_check_is_immediate() {
        let (callback, events) = collector();
        let mut probe = FallbackProbe::new(Arc::new(FixedCheck(true)), ProbeSettings::default());
        probe.start(callback).unwrap();

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(*events.lock(), vec![probe_status(true)]);

        tokio::time::sleep(DEFAULT_PROBE_INTERVAL).await;
        assert_eq!(events.lock().len(), 2);
        probe.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_reports_offline() {
        let (callback, events) = collector();
        let settings = ProbeSettings {
            interval: Duration::from_secs(2),
            timeout: Duration::from_millis(100),
        };
        let mut probe = FallbackProbe::new(Arc::new(HangingCheck), settings);
        probe.start(callback).unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(*events.lock(), vec![PathStatus::unsatisfied()]);
        probe.stop();
    }

    /// Blocks its worker thread, so abort cannot interrupt it mid-check.
    struct BlockingCheck(Duration);

    impl ReachabilityCheck for BlockingCheck {
        fn check(&self) -> BoxFuture<'_, bool> {
            Box::pin(async move {
                std::thread::sleep(self.0);
                true
            })
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_check_in_flight_at_stop_is_discarded() {
        let (callback, events) = collector();
        let mut probe = FallbackProbe::new(
            Arc::new(BlockingCheck(Duration::from_millis(200))),
            ProbeSettings::default(),
        );
        probe.start(callback).unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        probe.stop();

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(events.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_events() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let callback: PathCallback = Arc::new(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        let mut probe = FallbackProbe::new(Arc::new(FixedCheck(false)), ProbeSettings::default());
        probe.start(callback).unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(probe.is_running());

        probe.stop();
        probe.stop();
        assert!(!probe.is_running());

        let before = calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), before);
    }
}
