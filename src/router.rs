//! Router façade
//!
//! [`AgentRouter`] is the single entry point used by the HTTP handlers. It owns
//! the provider registry, the health monitor, the decision log and the metrics
//! registry, and is constructed explicitly at startup (there is no global
//! instance).

use crate::config::{Config, RecommendedConfig};
use crate::error::{AppResult, RouterResult};
use crate::health::{HealthMonitor, HealthSnapshot};
use crate::metrics::Metrics;
use crate::orchestration::{
    DecisionFilter, DecisionLog, DecisionPage, Executor, OrchestrationOutcome,
    OrchestrationRequest,
};
use crate::providers::{ProviderOptions, ProviderRegistry, ProviderSettings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Provider catalog as shown to the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvidersView {
    /// Provider names in declaration order
    pub providers: Vec<String>,
    pub models: BTreeMap<String, Vec<String>>,
    /// Current settings per provider
    pub active: BTreeMap<String, ProviderSettings>,
    pub recommended: RecommendedConfig,
}

/// Health overview as shown to the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthView {
    pub status: String,
    pub providers: HealthSnapshot,
    pub router_active: bool,
}

impl HealthView {
    fn new(providers: HealthSnapshot, router_active: bool) -> Self {
        Self {
            status: "ok".to_string(),
            providers,
            router_active,
        }
    }
}

pub struct AgentRouter {
    registry: Arc<ProviderRegistry>,
    health: Arc<HealthMonitor>,
    log: DecisionLog,
    executor: Executor,
    metrics: Arc<Metrics>,
}

impl AgentRouter {
    /// Build every provider named in `config` and start monitoring them
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// Returns an error if the provider registry or the metrics registry
    /// cannot be created.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let registry = ProviderRegistry::from_config(config)?;
        Self::new(registry, config)
    }

    /// Start the router around an already-built registry
    ///
    /// Only the health, orchestration and decision log sections of `config`
    /// are used; the `[[providers]]` list is ignored in favour of `registry`.
    ///
    /// # Errors
    /// Returns an error if metric registration fails.
    pub fn new(registry: ProviderRegistry, config: &Config) -> AppResult<Self> {
        let metrics = Arc::new(Metrics::new()?);
        let registry = Arc::new(registry);
        let health = Arc::new(HealthMonitor::start(
            &registry,
            &config.health,
            metrics.clone(),
        ));
        let log = DecisionLog::spawn(config.decision_log.capacity);
        let executor = Executor::new(
            registry.clone(),
            health.clone(),
            log.clone(),
            metrics.clone(),
            config.orchestration.timeout(),
        );

        tracing::info!(
            providers = registry.len(),
            decision_log_capacity = config.decision_log.capacity,
            orchestration_timeout_seconds = config.orchestration.timeout_seconds,
            "Agent router started"
        );

        Ok(Self {
            registry,
            health,
            log,
            executor,
            metrics,
        })
    }

    pub fn get_providers(&self) -> ProvidersView {
        let descriptors = self.registry.list_providers();
        ProvidersView {
            providers: descriptors.iter().map(|d| d.name.clone()).collect(),
            active: self
                .registry
                .entries()
                .iter()
                .map(|e| (e.name().to_string(), e.settings()))
                .collect(),
            models: descriptors.into_iter().map(|d| (d.name, d.models)).collect(),
            recommended: self.registry.recommended().clone(),
        }
    }

    pub fn get_health(&self) -> HealthView {
        HealthView::new(self.health.snapshot(), self.health.router_active())
    }

    /// Probe one provider (or all of them) now and report the result
    ///
    /// # Errors
    /// Returns `UnknownProvider` if `provider` names no registered provider.
    pub async fn refresh_health(&self, provider: Option<&str>) -> RouterResult<HealthView> {
        let snapshot = self.health.refresh_now(provider).await?;
        Ok(HealthView::new(snapshot, self.health.router_active()))
    }

    /// Change a provider's active model and sampling options
    ///
    /// # Errors
    /// `UnknownProvider`, `UnsupportedModel` or `InvalidOptions`; on error the
    /// previous settings are kept unchanged.
    pub fn configure_provider(
        &self,
        provider: &str,
        model: &str,
        options: &ProviderOptions,
    ) -> RouterResult<ProviderSettings> {
        self.registry.configure(provider, model, options)
    }

    /// Route `request` to a provider and record the decision
    pub async fn run_orchestration(
        &self,
        request: OrchestrationRequest,
    ) -> RouterResult<OrchestrationOutcome> {
        let decision = self.executor.execute(request).await?;
        Ok(OrchestrationOutcome::from(decision))
    }

    pub async fn get_decisions(&self, filter: DecisionFilter) -> DecisionPage {
        self.log.query(filter).await
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Stop background health probing
    ///
    /// In-flight orchestrations are not interrupted. The decision log stays
    /// readable until the router is dropped.
    pub fn shutdown(&self) {
        self.health.shutdown();
        tracing::info!("Agent router shut down");
    }
}
