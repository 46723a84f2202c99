//! Mock-data fallback decorator for dashboard reads
//!
//! Reads (providers, health, decision history) fall back to static sample data
//! when the wrapped transport fails. Commands (refresh, configure,
//! orchestrate) always reach the real router and report its errors.

use crate::api::{ConfigureRequest, ConfigureResponse, DecisionQuery};
use crate::client::{ClientError, ClientResult, RouterApi};
use crate::config::{ModelPairing, RecommendedConfig};
use crate::health::{HealthRecord, HealthSnapshot, HealthStatus};
use crate::orchestration::decision_log::DecisionBuffer;
use crate::orchestration::{
    Decision, DecisionFilter, DecisionPage, OrchestrationOutcome, OrchestrationRequest,
};
use crate::providers::ProviderSettings;
use crate::router::{HealthView, ProvidersView};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

const SAMPLE_PROVIDERS: [(&str, &[&str]); 2] = [
    ("ollama", &["llama2-7b", "mistral-7b"]),
    ("mock", &["mock-agent"]),
];

/// Wraps a transport and substitutes sample data when a read fails
pub struct MockFallback<T> {
    inner: T,
    fallback_reads: AtomicU64,
}

impl<T: RouterApi> MockFallback<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            fallback_reads: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Number of reads answered with sample data so far
    pub fn fallback_reads(&self) -> u64 {
        self.fallback_reads.load(Ordering::Relaxed)
    }

    fn substitute<V>(&self, operation: &str, error: &ClientError, sample: V) -> V {
        self.fallback_reads.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            operation = %operation,
            error = %error,
            "Router unreachable, serving sample data"
        );
        sample
    }
}

fn sample_providers() -> ProvidersView {
    ProvidersView {
        providers: SAMPLE_PROVIDERS.iter().map(|(name, _)| name.to_string()).collect(),
        models: SAMPLE_PROVIDERS
            .iter()
            .map(|(name, models)| {
                (
                    name.to_string(),
                    models.iter().map(|m| m.to_string()).collect(),
                )
            })
            .collect(),
        active: SAMPLE_PROVIDERS
            .iter()
            .map(|(name, models)| {
                (
                    name.to_string(),
                    ProviderSettings {
                        model: models[0].to_string(),
                        temperature: 0.7,
                        max_tokens: 1024,
                    },
                )
            })
            .collect(),
        recommended: RecommendedConfig {
            local: Some(ModelPairing {
                provider: "ollama".to_string(),
                model: "llama2-7b".to_string(),
            }),
            cloud: None,
        },
    }
}

fn sample_health() -> HealthView {
    let providers: HealthSnapshot = SAMPLE_PROVIDERS
        .iter()
        .map(|(name, _)| {
            let status = if *name == "mock" {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unknown
            };
            (name.to_string(), HealthRecord::with_status(status, None))
        })
        .collect();

    HealthView {
        status: "ok".to_string(),
        providers,
        router_active: false,
    }
}

fn sample_decisions(query: &DecisionQuery) -> DecisionPage {
    let mut buffer = DecisionBuffer::new(2);
    buffer.push(Decision {
        agent_name: "capacity_planning_agent".to_string(),
        event_type: "capacity_alert".to_string(),
        decision: "Schedule a capacity review for the affected cluster".to_string(),
        timestamp: Utc::now(),
        confidence: 0.75,
        provider: "mock".to_string(),
        model: "mock-agent".to_string(),
        actions_taken: vec!["schedule_capacity_review".to_string()],
    });
    buffer.push(Decision {
        agent_name: "incident_triage_agent".to_string(),
        event_type: "incident".to_string(),
        decision: "Assign to the service desk and link known errors".to_string(),
        timestamp: Utc::now(),
        confidence: 0.85,
        provider: "mock".to_string(),
        model: "mock-agent".to_string(),
        actions_taken: vec![
            "assign_service_desk".to_string(),
            "link_known_errors".to_string(),
        ],
    });
    buffer.query(&DecisionFilter::from(query.clone()))
}

#[async_trait]
impl<T: RouterApi> RouterApi for MockFallback<T> {
    async fn get_providers(&self) -> ClientResult<ProvidersView> {
        Ok(match self.inner.get_providers().await {
            Ok(view) => view,
            Err(e) => self.substitute("get_providers", &e, sample_providers()),
        })
    }

    async fn get_health(&self) -> ClientResult<HealthView> {
        Ok(match self.inner.get_health().await {
            Ok(view) => view,
            Err(e) => self.substitute("get_health", &e, sample_health()),
        })
    }

    async fn refresh_health(&self, provider: Option<&str>) -> ClientResult<HealthView> {
        self.inner.refresh_health(provider).await
    }

    async fn configure_provider(
        &self,
        request: &ConfigureRequest,
    ) -> ClientResult<ConfigureResponse> {
        self.inner.configure_provider(request).await
    }

    async fn run_orchestration(
        &self,
        request: &OrchestrationRequest,
    ) -> ClientResult<OrchestrationOutcome> {
        self.inner.run_orchestration(request).await
    }

    async fn get_decisions(&self, query: &DecisionQuery) -> ClientResult<DecisionPage> {
        Ok(match self.inner.get_decisions(query).await {
            Ok(page) => page,
            Err(e) => self.substitute("get_decisions", &e, sample_decisions(query)),
        })
    }
}
