//! Container health monitoring

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use localdev_core::config::HealthConfig;
use localdev_docker::{ContainerRuntime, HealthLogEntry, HealthState};

use crate::error::HealthError;
use crate::input::CancelSignal;
use crate::window::LineSender;

/// How a health wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthOutcome {
    /// The container reported healthy
    Healthy,
    /// The timeout elapsed first
    TimedOut,
    /// The user asked to stop waiting
    Cancelled,
    /// The container declares no health check; nothing was waited for
    NoHealthCheck,
}

impl HealthOutcome {
    /// Whether the container is known to be healthy
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

impl fmt::Display for HealthOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Healthy => "healthy",
            Self::TimedOut => "not healthy (timed out)",
            Self::Cancelled => "not healthy (cancelled)",
            Self::NoHealthCheck => "no health check",
        };
        write!(f, "{}", s)
    }
}

/// Timing of a health wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthSettings {
    /// Give up after this long
    pub timeout: Duration,
    /// Delay between health probes
    pub poll_interval: Duration,
    /// Delay between health log refreshes
    pub log_interval: Duration,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self::from(&HealthConfig::default())
    }
}

impl From<&HealthConfig> for HealthSettings {
    fn from(config: &HealthConfig) -> Self {
        Self {
            timeout: config.timeout(),
            poll_interval: config.poll_interval(),
            log_interval: config.log_interval(),
        }
    }
}

/// Result of one health wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    /// How the wait ended
    pub outcome: HealthOutcome,
    /// Number of health probes issued
    pub probes: usize,
    /// Number of health log entries forwarded to the display
    pub log_entries: usize,
    /// Time spent waiting
    pub elapsed: Duration,
}

/// Waits for a container to become healthy
#[derive(Clone)]
pub struct HealthMonitor {
    runtime: Arc<dyn ContainerRuntime>,
    settings: HealthSettings,
}

impl HealthMonitor {
    /// Create a monitor for `runtime`
    pub fn new(runtime: Arc<dyn ContainerRuntime>, settings: HealthSettings) -> Self {
        Self { runtime, settings }
    }

    /// The container runtime being watched
    pub fn runtime(&self) -> &Arc<dyn ContainerRuntime> {
        &self.runtime
    }

    /// Timing in use
    pub fn settings(&self) -> HealthSettings {
        self.settings
    }

    /// Wait until the container is healthy, the timeout elapses or the user cancels
    ///
    /// Health log entries are forwarded to `display` as they appear. The poller and
    /// log tailer are stopped before this returns, whatever the outcome.
    #[instrument(skip_all, fields(container = %container_id))]
    pub async fn wait(
        &self,
        container_id: &str,
        display: Option<&LineSender>,
        cancel: &mut CancelSignal,
    ) -> Result<HealthReport, HealthError> {
        let start = Instant::now();

        let has_check = self
            .runtime
            .has_health_check(container_id)
            .await
            .map_err(|source| HealthError::Inspect {
                container: container_id.to_string(),
                source,
            })?;
        if !has_check {
            info!("container declares no health check");
            return Ok(HealthReport {
                outcome: HealthOutcome::NoHealthCheck,
                probes: 0,
                log_entries: 0,
                elapsed: start.elapsed(),
            });
        }

        let probes = Arc::new(AtomicUsize::new(0));
        let (healthy_tx, mut healthy_rx) = oneshot::channel();
        let (log_tx, mut log_rx) = mpsc::unbounded_channel();

        let poller = tokio::spawn(poll_health(
            self.runtime.clone(),
            container_id.to_string(),
            self.settings.poll_interval,
            probes.clone(),
            healthy_tx,
        ));
        let tailer = tokio::spawn(tail_health_log(
            self.runtime.clone(),
            container_id.to_string(),
            self.settings.log_interval,
            log_tx,
        ));

        let deadline = tokio::time::sleep(self.settings.timeout);
        tokio::pin!(deadline);

        let mut log_entries = 0usize;
        let mut poller_alive = true;
        let outcome = loop {
            tokio::select! {
                biased;
                probed = &mut healthy_rx, if poller_alive => match probed {
                    Ok(()) => break HealthOutcome::Healthy,
                    Err(_) => {
                        debug!("health poller stopped unexpectedly");
                        poller_alive = false;
                    }
                },
                _ = cancel.recv() => break HealthOutcome::Cancelled,
                _ = &mut deadline => break HealthOutcome::TimedOut,
                Some(entry) = log_rx.recv() => {
                    log_entries += 1;
                    if let Some(display) = display {
                        for line in format_log_entry(&entry) {
                            let _ = display.send(line);
                        }
                    }
                }
            }
        };

        poller.abort();
        tailer.abort();

        let report = HealthReport {
            outcome,
            probes: probes.load(Ordering::SeqCst),
            log_entries,
            elapsed: start.elapsed(),
        };
        info!(outcome = %report.outcome, probes = report.probes, "health wait finished");
        Ok(report)
    }
}

/// Probe immediately, then every `interval`, until the container is healthy
async fn poll_health(
    runtime: Arc<dyn ContainerRuntime>,
    id: String,
    interval: Duration,
    probes: Arc<AtomicUsize>,
    healthy: oneshot::Sender<()>,
) {
    loop {
        probes.fetch_add(1, Ordering::SeqCst);
        match runtime.health_state(&id).await {
            Ok(HealthState::Healthy) => {
                let _ = healthy.send(());
                return;
            }
            Ok(state) => debug!(%state, "container not healthy yet"),
            // The wait window is on screen; console-level logs would corrupt it
            Err(e) => debug!(error = %e, "health probe failed"),
        }
        tokio::time::sleep(interval).await;
    }
}

/// Forward health log entries, each once, keyed by start time
async fn tail_health_log(
    runtime: Arc<dyn ContainerRuntime>,
    id: String,
    interval: Duration,
    entries: mpsc::UnboundedSender<HealthLogEntry>,
) {
    let mut seen: HashSet<DateTime<Utc>> = HashSet::new();
    loop {
        match runtime.health_log(&id).await {
            Ok(log) => {
                for entry in log {
                    if seen.insert(entry.start) && entries.send(entry).is_err() {
                        return;
                    }
                }
            }
            Err(e) => debug!(error = %e, "health log unavailable"),
        }
        tokio::time::sleep(interval).await;
    }
}

fn format_log_entry(entry: &HealthLogEntry) -> Vec<String> {
    let stamp = entry.start.format("%H:%M:%S");
    let output = entry.output.trim_end();
    if output.is_empty() {
        return vec![format!("[{}] exit {}", stamp, entry.exit_code)];
    }
    output
        .lines()
        .map(|line| format!("[{}] exit {}: {}", stamp, entry.exit_code, line))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use localdev_docker::{Container, MockRuntime};

    fn settings() -> HealthSettings {
        HealthSettings {
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(1),
            log_interval: Duration::from_millis(250),
        }
    }

    fn entry(secs: i64, output: &str) -> HealthLogEntry {
        let start = Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap();
        HealthLogEntry {
            start,
            end: start,
            exit_code: 1,
            output: output.to_string(),
        }
    }

    fn monitor(runtime: MockRuntime) -> (Arc<MockRuntime>, HealthMonitor) {
        let runtime = Arc::new(runtime);
        let monitor = HealthMonitor::new(runtime.clone(), settings());
        (runtime, monitor)
    }

    #[tokio::test(start_paused = true)]
    async fn test_becomes_healthy() {
        let (runtime, monitor) = monitor(
            MockRuntime::new()
                .with_container(Container::new("c1", "app_api_1"))
                .with_health("c1", [HealthState::Starting, HealthState::Starting, HealthState::Healthy]),
        );

        let report = monitor.wait("c1", None, &mut CancelSignal::never()).await.unwrap();
        assert_eq!(report.outcome, HealthOutcome::Healthy);
        assert_eq!(report.probes, 3);
        assert_eq!(runtime.probe_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let (runtime, monitor) = monitor(
            MockRuntime::new().with_health("c1", [HealthState::Unhealthy]),
        );

        let report = monitor.wait("c1", None, &mut CancelSignal::never()).await.unwrap();
        assert_eq!(report.outcome, HealthOutcome::TimedOut);
        assert!(report.elapsed >= Duration::from_secs(30));

        // Nothing probes after resolution
        let probes = runtime.probe_count();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(runtime.probe_count(), probes);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_by_user() {
        let (_runtime, monitor) = monitor(
            MockRuntime::new().with_health("c1", [HealthState::Starting]),
        );
        let (tx, mut cancel) = CancelSignal::channel();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            let _ = tx.send(());
        });

        let report = monitor.wait("c1", None, &mut cancel).await.unwrap();
        assert_eq!(report.outcome, HealthOutcome::Cancelled);
        assert!(report.elapsed < Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_health_check() {
        let (runtime, monitor) = monitor(
            MockRuntime::new().with_container(Container::new("c2", "app_db_1")),
        );

        let report = monitor.wait("c2", None, &mut CancelSignal::never()).await.unwrap();
        assert_eq!(report.outcome, HealthOutcome::NoHealthCheck);
        assert_eq!(runtime.probe_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_container_is_error() {
        let (_runtime, monitor) = monitor(MockRuntime::new());
        let err = monitor
            .wait("ghost", None, &mut CancelSignal::never())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_forwarded_after_resolution() {
        let runtime = MockRuntime::new().with_health("c1", [HealthState::Starting]);
        runtime.push_log("c1", entry(0, "starting"));
        let (runtime, monitor) = monitor(runtime);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let report = monitor
            .wait("c1", Some(&tx), &mut CancelSignal::never())
            .await
            .unwrap();
        assert_eq!(report.outcome, HealthOutcome::TimedOut);
        while rx.try_recv().is_ok() {}

        runtime.push_log("c1", entry(40, "late entry"));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn test_log_entries_forwarded_once() {
        let runtime = MockRuntime::new().with_health(
            "c1",
            [
                HealthState::Starting,
                HealthState::Starting,
                HealthState::Starting,
                HealthState::Healthy,
            ],
        );
        runtime.push_log("c1", entry(0, "connection refused\n"));
        runtime.push_log("c1", entry(1, ""));
        let (runtime, monitor) = monitor(runtime);

        let later = runtime.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            later.push_log("c1", entry(2, "ok"));
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let report = monitor
            .wait("c1", Some(&tx), &mut CancelSignal::never())
            .await
            .unwrap();
        assert_eq!(report.outcome, HealthOutcome::Healthy);
        assert_eq!(report.log_entries, 3);

        drop(tx);
        let mut lines = Vec::new();
        while let Some(line) = rx.recv().await {
            lines.push(line);
        }
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("exit 1: connection refused"));
        assert!(lines[1].ends_with("exit 1"));
        assert!(lines[2].ends_with("exit 1: ok"));
    }
}
