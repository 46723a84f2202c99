//! Orchestration execution with a single fallback attempt
//!
//! The first provider is chosen before any work is spawned, so selection
//! errors come back without touching the network. The attempt sequence itself
//! runs in its own task: a caller that gives up does not cancel an in-flight
//! provider call, and a late success is still recorded.
//!
//! Invocation failures never change health state; only the health monitor's
//! probes do.

use crate::error::{ProviderError, RouterError, RouterResult};
use crate::health::HealthMonitor;
use crate::metrics::{Metrics, Outcome};
use crate::orchestration::{Decision, DecisionLog, OrchestrationRequest, selector};
use crate::providers::{ExclusionSet, Invocation, ProviderName, ProviderRegistry};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Provider round trips per orchestration: the chosen provider plus one alternate
pub const MAX_ATTEMPTS: usize = 2;

#[derive(Clone)]
pub struct Executor {
    registry: Arc<ProviderRegistry>,
    health: Arc<HealthMonitor>,
    log: DecisionLog,
    metrics: Arc<Metrics>,
    timeout: Duration,
}

impl Executor {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        health: Arc<HealthMonitor>,
        log: DecisionLog,
        metrics: Arc<Metrics>,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            health,
            log,
            metrics,
            timeout,
        }
    }

    /// Run `request` to a recorded decision
    ///
    /// # Errors
    /// - selection errors (`UnknownProvider`, `ProviderUnavailable`,
    ///   `NoHealthyProvider`) before any provider is called
    /// - `ExecutionError` once the chosen provider and, if one was eligible,
    ///   the alternate have failed
    pub async fn execute(&self, request: OrchestrationRequest) -> RouterResult<Decision> {
        let first = selector::select(&request, &self.health.snapshot(), &ExclusionSet::new())?;

        let executor = self.clone();
        tokio::spawn(async move { executor.run_attempts(request, first).await })
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Orchestration task failed");
                RouterError::Internal(format!("orchestration task failed: {}", e))
            })?
    }

    async fn run_attempts(
        &self,
        request: OrchestrationRequest,
        first: ProviderName,
    ) -> RouterResult<Decision> {
        let mut excluded = ExclusionSet::new();
        let mut provider = first;
        let mut attempt = 1;

        loop {
            let (client, settings) = self.registry.resolve(provider.as_str())?;

            tracing::debug!(
                provider = %provider,
                model = %settings.model,
                event_type = %request.event_type(),
                attempt,
                max_attempts = MAX_ATTEMPTS,
                "Invoking provider"
            );

            let started = Instant::now();
            let result = tokio::time::timeout(self.timeout, client.invoke(&request, &settings)).await;
            self.metrics.record_invocation_duration(
                provider.as_str(),
                started.elapsed().as_secs_f64() * 1000.0,
            );

            let error = match flatten_timeout(result, &provider, self.timeout) {
                Ok(invocation) => {
                    self.metrics
                        .record_orchestration(provider.as_str(), Outcome::Success);
                    return Ok(self.record(&request, &provider, &settings.model, invocation));
                }
                Err(error) => error,
            };

            self.metrics
                .record_orchestration(provider.as_str(), Outcome::Failure);
            tracing::warn!(
                provider = %provider,
                error = %error,
                error_kind = error.kind(),
                attempt,
                max_attempts = MAX_ATTEMPTS,
                "Provider invocation failed"
            );
            excluded.insert(provider.clone());

            if attempt >= MAX_ATTEMPTS {
                return Err(RouterError::ExecutionError {
                    attempts: attempt,
                    last_error: error,
                });
            }

            // The alternate is ranked normally; an override only pins the first attempt
            let fallback = request.without_override();
            match selector::select(&fallback, &self.health.snapshot(), &excluded) {
                Ok(next) => {
                    tracing::info!(
                        failed_provider = %provider,
                        fallback_provider = %next,
                        event_type = %request.event_type(),
                        "Falling back to alternate provider"
                    );
                    self.metrics.record_fallback();
                    provider = next;
                    attempt += 1;
                }
                Err(selection_error) => {
                    tracing::warn!(
                        failed_provider = %provider,
                        reason = %selection_error,
                        "No alternate provider eligible"
                    );
                    return Err(RouterError::ExecutionError {
                        attempts: attempt,
                        last_error: error,
                    });
                }
            }
        }
    }

    fn record(
        &self,
        request: &OrchestrationRequest,
        provider: &ProviderName,
        model: &str,
        invocation: Invocation,
    ) -> Decision {
        let decision = Decision::new(request, provider.as_str(), model, invocation, Utc::now());

        tracing::info!(
            provider = %provider,
            model = %model,
            agent = %decision.agent_name,
            event_type = %decision.event_type,
            confidence = decision.confidence,
            "Orchestration decision recorded"
        );

        self.log.append(decision.clone());
        self.metrics.record_decision_append();
        decision
    }
}

fn flatten_timeout(
    result: Result<Result<Invocation, ProviderError>, tokio::time::error::Elapsed>,
    provider: &ProviderName,
    timeout: Duration,
) -> Result<Invocation, ProviderError> {
    match result {
        Ok(outcome) => outcome,
        Err(_elapsed) => Err(ProviderError::Timeout {
            provider: provider.to_string(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}
