//! Prometheus metrics for opsroute
//!
//! Tracks:
//! - orchestration outcomes per provider, and how often fallback was needed
//! - provider invocation latency
//! - health probes and health status transitions
//! - decision log appends
//!
//! Exposed via the `/metrics` endpoint in Prometheus text format. Recording
//! never fails a request: label or value problems are logged and dropped.

use crate::health::HealthStatus;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Result label for `opsroute_orchestrations_total`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        }
    }
}

/// Result label for `opsroute_probes_total`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    Success,
    Failure,
    Timeout,
}

impl ProbeResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeResult::Success => "success",
            ProbeResult::Failure => "failure",
            ProbeResult::Timeout => "timeout",
        }
    }
}

/// Metrics collector
///
/// Provider labels come from configuration, so cardinality is bounded by the
/// number of registered providers.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    orchestrations_total: IntCounterVec,
    fallbacks_total: IntCounter,
    invocation_duration: HistogramVec,
    probes_total: IntCounterVec,
    health_transitions: IntCounterVec,
    decision_log_appends: IntCounter,
}

impl Metrics {
    /// Create a new Metrics instance with its own registry
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: N providers × 2 outcomes
        let orchestrations_total = IntCounterVec::new(
            Opts::new(
                "opsroute_orchestrations_total",
                "Provider invocation attempts by provider and outcome",
            ),
            &["provider", "outcome"],
        )?;

        let fallbacks_total = IntCounter::with_opts(Opts::new(
            "opsroute_fallbacks_total",
            "Orchestrations that needed a second provider after the first one failed",
        ))?;

        let invocation_duration = HistogramVec::new(
            HistogramOpts::new(
                "opsroute_invocation_duration_ms",
                "Provider invocation latency in milliseconds",
            )
            .buckets(vec![
                10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
            ]),
            &["provider"],
        )?;

        // Cardinality: N providers × 3 results
        let probes_total = IntCounterVec::new(
            Opts::new(
                "opsroute_probes_total",
                "Health probes by provider and result",
            ),
            &["provider", "result"],
        )?;

        // Cardinality: N providers × 4 statuses
        let health_transitions = IntCounterVec::new(
            Opts::new(
                "opsroute_health_transitions_total",
                "Health status changes by provider and new status",
            ),
            &["provider", "status"],
        )?;

        let decision_log_appends = IntCounter::with_opts(Opts::new(
            "opsroute_decision_log_appends_total",
            "Decisions appended to the decision log",
        ))?;

        registry.register(Box::new(orchestrations_total.clone()))?;
        registry.register(Box::new(fallbacks_total.clone()))?;
        registry.register(Box::new(invocation_duration.clone()))?;
        registry.register(Box::new(probes_total.clone()))?;
        registry.register(Box::new(health_transitions.clone()))?;
        registry.register(Box::new(decision_log_appends.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            orchestrations_total,
            fallbacks_total,
            invocation_duration,
            probes_total,
            health_transitions,
            decision_log_appends,
        })
    }

    /// Record one invocation attempt
    pub fn record_orchestration(&self, provider: &str, outcome: Outcome) {
        match self
            .orchestrations_total
            .get_metric_with_label_values(&[provider, outcome.as_str()])
        {
            Ok(counter) => counter.inc(),
            Err(e) => tracing::warn!(
                provider = %provider,
                error = %e,
                "Failed to record orchestration metric"
            ),
        }
    }

    pub fn record_fallback(&self) {
        self.fallbacks_total.inc();
    }

    /// Record invocation latency
    ///
    /// NaN, infinite and negative durations are rejected: they would corrupt
    /// every percentile of the histogram.
    pub fn record_invocation_duration(&self, provider: &str, duration_ms: f64) {
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            tracing::warn!(
                provider = %provider,
                duration_ms,
                "Ignoring invalid invocation duration"
            );
            return;
        }

        match self
            .invocation_duration
            .get_metric_with_label_values(&[provider])
        {
            Ok(histogram) => histogram.observe(duration_ms),
            Err(e) => tracing::warn!(
                provider = %provider,
                error = %e,
                "Failed to record invocation duration"
            ),
        }
    }

    pub fn record_probe(&self, provider: &str, result: ProbeResult) {
        match self
            .probes_total
            .get_metric_with_label_values(&[provider, result.as_str()])
        {
            Ok(counter) => counter.inc(),
            Err(e) => tracing::warn!(
                provider = %provider,
                error = %e,
                "Failed to record probe metric"
            ),
        }
    }

    pub fn record_health_transition(&self, provider: &str, status: HealthStatus) {
        match self
            .health_transitions
            .get_metric_with_label_values(&[provider, status.as_str()])
        {
            Ok(counter) => counter.inc(),
            Err(e) => tracing::warn!(
                provider = %provider,
                error = %e,
                "Failed to record health transition metric"
            ),
        }
    }

    pub fn record_decision_append(&self) {
        self.decision_log_appends.inc();
    }

    /// Current value of `opsroute_fallbacks_total`
    pub fn fallbacks_count(&self) -> u64 {
        self.fallbacks_total.get()
    }

    /// Current value of `opsroute_decision_log_appends_total`
    pub fn decision_appends_count(&self) -> u64 {
        self.decision_log_appends.get()
    }

    /// Gather all metrics and encode them in Prometheus text format
    ///
    /// # Errors
    ///
    /// Returns an error if metric encoding fails.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();

        tracing::debug!(
            metric_family_count = metric_families.len(),
            "Encoding metrics to Prometheus text format"
        );

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|e| {
                tracing::error!(error = %e, "Prometheus text encoder failed");
                e
            })?;

        String::from_utf8(buffer).map_err(|e| {
            tracing::error!(
                invalid_byte_index = e.utf8_error().valid_up_to(),
                "Prometheus encoder produced invalid UTF-8"
            );
            prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e))
        })
    }
}
