//! Health monitor: one probing worker per provider
//!
//! Workers own their provider's [`HealthRecord`] and publish every change
//! through a `watch` channel, so snapshots never wait on a probe. Refresh
//! requests are sent to the worker as commands; requests that arrive while a
//! probe is running join that probe instead of starting another one.

use crate::config::HealthConfig;
use crate::error::{ProviderError, RouterError, RouterResult};
use crate::health::record::{HealthPolicy, HealthRecord, HealthSnapshot, HealthStatus};
use crate::metrics::{Metrics, ProbeResult};
use crate::providers::{Provider, ProviderRegistry};
use futures::future::join_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Pending refresh requests per worker
const COMMAND_BUFFER: usize = 32;

/// Time allowed after a probe's deadline for its result to be published
const PUBLISH_MARGIN: Duration = Duration::from_millis(50);

enum WorkerCommand {
    Refresh(RefreshWaiter),
}

/// A refresh caller attached to a probe
struct RefreshWaiter {
    /// Receives the deadline of the probe this refresh joined
    accepted: Option<oneshot::Sender<Instant>>,
    reply: oneshot::Sender<HealthRecord>,
}

impl RefreshWaiter {
    fn accept(&mut self, deadline: Instant) {
        if let Some(accepted) = self.accepted.take() {
            let _ = accepted.send(deadline);
        }
    }
}

struct WorkerHandle {
    name: String,
    records: watch::Receiver<HealthRecord>,
    commands: mpsc::Sender<WorkerCommand>,
    task: AbortHandle,
}

/// Tracks the health of every registered provider
///
/// Workers stop on [`HealthMonitor::shutdown`] or when the monitor is dropped.
pub struct HealthMonitor {
    workers: Vec<WorkerHandle>,
    router_active: Arc<AtomicBool>,
    probe_timeout: Duration,
}

impl HealthMonitor {
    /// Spawn one worker per provider in `registry`
    ///
    /// Must be called from within a Tokio runtime. The first probe of every
    /// provider runs immediately.
    pub fn start(registry: &ProviderRegistry, config: &HealthConfig, metrics: Arc<Metrics>) -> Self {
        let router_active = Arc::new(AtomicBool::new(false));
        let policy = HealthPolicy::from(config);

        let workers = registry
            .entries()
            .iter()
            .map(|entry| {
                let (publisher, records) = watch::channel(HealthRecord::new());
                let (commands, inbox) = mpsc::channel(COMMAND_BUFFER);

                let worker = HealthWorker {
                    name: entry.name().to_string(),
                    provider: entry.provider(),
                    policy,
                    interval: config.interval(),
                    probe_timeout: config.probe_timeout(),
                    record: HealthRecord::new(),
                    publisher,
                    commands: inbox,
                    router_active: router_active.clone(),
                    metrics: metrics.clone(),
                };

                let task = spawn_supervised(entry.name().to_string(), worker);

                WorkerHandle {
                    name: entry.name().to_string(),
                    records,
                    commands,
                    task,
                }
            })
            .collect::<Vec<_>>();

        tracing::info!(
            providers = workers.len(),
            interval_seconds = config.interval_seconds,
            probe_timeout_seconds = config.probe_timeout_seconds,
            unhealthy_threshold = config.unhealthy_threshold,
            "Health monitor started"
        );

        Self {
            workers,
            router_active,
            probe_timeout: config.probe_timeout(),
        }
    }

    /// Current health of every provider, in registry order
    pub fn snapshot(&self) -> HealthSnapshot {
        let now = Instant::now();
        self.workers
            .iter()
            .map(|worker| (worker.name.clone(), worker.records.borrow().aged(now)))
            .collect()
    }

    /// Probe one provider (or all, concurrently) right away
    ///
    /// Each refresh joins the provider's in-flight probe or starts one, and
    /// waits for that probe's result. Probes are bounded by the probe timeout,
    /// so a hung provider is reported as a timeout failure once it expires.
    ///
    /// # Errors
    /// Returns `UnknownProvider` if `provider` names no registered provider.
    pub async fn refresh_now(&self, provider: Option<&str>) -> RouterResult<HealthSnapshot> {
        let targets: Vec<&WorkerHandle> = match provider {
            Some(name) => {
                let worker = self
                    .workers
                    .iter()
                    .find(|w| w.name == name)
                    .ok_or_else(|| RouterError::UnknownProvider {
                        name: name.to_string(),
                        available: self
                            .workers
                            .iter()
                            .map(|w| w.name.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                    })?;
                vec![worker]
            }
            None => self.workers.iter().collect(),
        };

        tracing::debug!(
            providers = ?targets.iter().map(|w| w.name.as_str()).collect::<Vec<_>>(),
            "Manual health refresh requested"
        );

        join_all(targets.into_iter().map(|worker| self.refresh_worker(worker))).await;
        Ok(self.snapshot())
    }

    async fn refresh_worker(&self, worker: &WorkerHandle) {
        let (accepted, deadline) = oneshot::channel();
        let (reply, result) = oneshot::channel();
        if worker
            .commands
            .send(WorkerCommand::Refresh(RefreshWaiter {
                accepted: Some(accepted),
                reply,
            }))
            .await
            .is_err()
        {
            tracing::warn!(
                provider = %worker.name,
                "Health worker is not running; returning last known state"
            );
            return;
        }

        // The wait is bounded by the deadline of the probe the refresh joined,
        // so a timed-out probe still reports its failure to this caller
        let deadline = match tokio::time::timeout(self.probe_timeout, deadline).await {
            Ok(Ok(deadline)) => deadline,
            Ok(Err(_)) => {
                tracing::warn!(
                    provider = %worker.name,
                    "Health worker stopped before accepting refresh"
                );
                return;
            }
            Err(_) => {
                tracing::warn!(
                    provider = %worker.name,
                    timeout_ms = self.probe_timeout.as_millis() as u64,
                    "Health worker did not accept refresh; returning last known state"
                );
                return;
            }
        };

        match tokio::time::timeout_at(deadline + PUBLISH_MARGIN, result).await {
            Ok(Ok(_)) => {}
            Ok(Err(_)) => {
                tracing::warn!(
                    provider = %worker.name,
                    "Health worker stopped before answering refresh"
                );
            }
            Err(_) => {
                tracing::debug!(
                    provider = %worker.name,
                    timeout_ms = self.probe_timeout.as_millis() as u64,
                    "Refresh wait expired before the probe result was published"
                );
            }
        }
    }

    /// True once any provider has been classified healthy
    pub fn router_active(&self) -> bool {
        self.router_active.load(Ordering::Acquire)
    }

    /// Stop every worker; snapshots keep returning the last published state
    pub fn shutdown(&self) {
        for worker in &self.workers {
            worker.task.abort();
        }
        tracing::info!(providers = self.workers.len(), "Health monitor stopped");
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.task.abort();
        }
    }
}

/// Spawn a worker and a watcher that reports how it ended
fn spawn_supervised(name: String, worker: HealthWorker) -> AbortHandle {
    let handle = tokio::spawn(worker.run());
    let task = handle.abort_handle();

    tokio::spawn(async move {
        match handle.await {
            Ok(()) => {
                tracing::debug!(provider = %name, "Health worker finished");
            }
            Err(e) if e.is_cancelled() => {
                tracing::debug!(provider = %name, "Health worker cancelled");
            }
            Err(e) => {
                tracing::error!(
                    provider = %name,
                    error = %e,
                    "Health worker panicked. Health for this provider is frozen at its \
                    last published state until restart."
                );
            }
        }
    });

    task
}

struct HealthWorker {
    name: String,
    provider: Arc<dyn Provider>,
    policy: HealthPolicy,
    interval: Duration,
    probe_timeout: Duration,
    record: HealthRecord,
    publisher: watch::Sender<HealthRecord>,
    commands: mpsc::Receiver<WorkerCommand>,
    router_active: Arc<AtomicBool>,
    metrics: Arc<Metrics>,
}

impl HealthWorker {
    async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let mut waiters = Vec::new();

            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(WorkerCommand::Refresh(waiter)) => waiters.push(waiter),
                    // Monitor dropped
                    None => break,
                },
                _ = ticker.tick() => {
                    tracing::trace!(provider = %self.name, "Scheduled health probe");
                }
            }

            self.probe(&mut waiters).await;
            // Any probe, scheduled or manual, restarts the interval
            ticker.reset();

            for waiter in waiters {
                let _ = waiter.reply.send(self.record.clone());
            }
        }
    }

    async fn probe(&mut self, waiters: &mut Vec<RefreshWaiter>) {
        let provider = self.provider.clone();
        let probe_timeout = self.probe_timeout;
        let started = Instant::now();
        let deadline = started + probe_timeout;
        for waiter in waiters.iter_mut() {
            waiter.accept(deadline);
        }

        let probe = async move {
            let result = tokio::time::timeout_at(deadline, provider.probe()).await;
            (result, started.elapsed())
        };
        tokio::pin!(probe);

        // Refreshes arriving mid-probe share its result
        let (result, elapsed) = loop {
            tokio::select! {
                biased;

                outcome = &mut probe => break outcome,
                Some(WorkerCommand::Refresh(mut waiter)) = self.commands.recv() => {
                    waiter.accept(deadline);
                    waiters.push(waiter);
                }
            }
        };

        let previous = self.record.status();
        let now = Instant::now();

        match result {
            Ok(Ok(())) => {
                let latency_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
                self.record.record_success(latency_ms, now, &self.policy);
                self.metrics.record_probe(&self.name, ProbeResult::Success);
                tracing::debug!(provider = %self.name, latency_ms, "Health probe succeeded");
            }
            Ok(Err(error)) => {
                self.fail(error, now, ProbeResult::Failure);
            }
            Err(_elapsed) => {
                let error = ProviderError::Timeout {
                    provider: self.name.clone(),
                    timeout_ms: u64::try_from(probe_timeout.as_millis()).unwrap_or(u64::MAX),
                };
                self.fail(error, now, ProbeResult::Timeout);
            }
        }

        let current = self.record.status();
        if current != previous {
            self.log_transition(previous, current);
            self.metrics.record_health_transition(&self.name, current);
        }

        if current == HealthStatus::Healthy {
            self.router_active.store(true, Ordering::Release);
        }

        self.publisher.send_replace(self.record.clone());
    }

    fn fail(&mut self, error: ProviderError, now: Instant, result: ProbeResult) {
        tracing::debug!(
            provider = %self.name,
            error = %error,
            error_kind = error.kind(),
            consecutive_failures = self.record.consecutive_failures() + 1,
            "Health probe failed"
        );
        self.record.record_failure(error.to_string(), now, &self.policy);
        self.metrics.record_probe(&self.name, result);
    }

    fn log_transition(&self, previous: HealthStatus, current: HealthStatus) {
        match current {
            HealthStatus::Unhealthy => tracing::warn!(
                provider = %self.name,
                previous = %previous,
                consecutive_failures = self.record.consecutive_failures(),
                reason = %self.record.message(),
                "Provider marked unhealthy"
            ),
            HealthStatus::Degraded => tracing::warn!(
                provider = %self.name,
                previous = %previous,
                latency_ms = ?self.record.latency_ms(),
                reason = %self.record.message(),
                "Provider degraded"
            ),
            _ => tracing::info!(
                provider = %self.name,
                previous = %previous,
                status = %current,
                latency_ms = ?self.record.latency_ms(),
                "Provider health changed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecommendedConfig;
    use crate::providers::mock::MockProvider;
    use crate::providers::{ProviderDescriptor, ProviderSettings, RegistryEntry};
    use crate::config::{ProviderCategory, ProviderKind};

    fn registry(names: &[&str]) -> ProviderRegistry {
        let entries = names
            .iter()
            .map(|name| {
                RegistryEntry::new(
                    ProviderDescriptor {
                        name: name.to_string(),
                        kind: ProviderKind::Mock,
                        category: ProviderCategory::Local,
                        models: vec!["mock-agent".to_string()],
                    },
                    ProviderSettings {
                        model: "mock-agent".to_string(),
                        temperature: 0.7,
                        max_tokens: 128,
                    },
                    Arc::new(MockProvider::new(*name)),
                )
            })
            .collect();
        ProviderRegistry::new(entries, RecommendedConfig::default()).unwrap()
    }

    fn metrics() -> Arc<Metrics> {
        Arc::new(Metrics::new().unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_before_first_probe_is_unknown() {
        let monitor = HealthMonitor::start(&registry(&["a", "b"]), &HealthConfig::default(), metrics());
        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(snapshot.iter().all(|(_, r)| r.status() == HealthStatus::Unknown));
        assert!(!monitor.router_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_all_marks_mock_healthy() {
        let monitor = HealthMonitor::start(&registry(&["a", "b"]), &HealthConfig::default(), metrics());
        let snapshot = monitor.refresh_now(None).await.unwrap();
        assert_eq!(snapshot.status("a"), Some(HealthStatus::Healthy));
        assert_eq!(snapshot.status("b"), Some(HealthStatus::Healthy));
        assert!(monitor.router_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_unknown_provider_fails() {
        let monitor = HealthMonitor::start(&registry(&["a"]), &HealthConfig::default(), metrics());
        let err = monitor.refresh_now(Some("zzz")).await.unwrap_err();
        assert!(matches!(err, RouterError::UnknownProvider { ref name, .. } if name == "zzz"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_survives_shutdown() {
        let monitor = HealthMonitor::start(&registry(&["a"]), &HealthConfig::default(), metrics());
        monitor.refresh_now(Some("a")).await.unwrap();
        monitor.shutdown();
        tokio::task::yield_now().await;

        let snapshot = monitor.refresh_now(Some("a")).await.unwrap();
        assert_eq!(snapshot.status("a"), Some(HealthStatus::Healthy));
    }
}
