//! Deterministic in-process provider
//!
//! Produces rule-based decisions without any network access. Used for demos,
//! as the last-resort provider in small deployments, and in tests.

use crate::error::ProviderError;
use crate::orchestration::OrchestrationRequest;
use crate::providers::{Invocation, Provider, ProviderSettings};
use async_trait::async_trait;
use serde_json::Value;

/// Capacity utilisation (percent) at which the mock recommends scaling out
const SCALE_OUT_UTILIZATION: f64 = 90.0;

pub struct MockProvider {
    name: String,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn decide(request: &OrchestrationRequest) -> Invocation {
        let context = request.context();
        let severity = context
            .get("severity")
            .and_then(Value::as_str)
            .map(str::to_ascii_lowercase);

        let (decision, confidence, actions): (&str, f64, Vec<&str>) = match request.event_type() {
            "incident" if matches!(severity.as_deref(), Some("critical" | "high")) => (
                "Escalate to the on-call engineer and open a major incident bridge",
                0.92,
                vec![
                    "page_on_call",
                    "open_major_incident_bridge",
                    "notify_service_owner",
                ],
            ),
            "incident" => (
                "Route to the service desk queue for standard triage",
                0.85,
                vec!["assign_service_desk", "link_known_errors"],
            ),
            "capacity_alert" => {
                let utilization = context
                    .get("utilization")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0);
                if utilization >= SCALE_OUT_UTILIZATION {
                    (
                        "Scale out the affected service before saturation",
                        0.88,
                        vec!["trigger_autoscale", "open_capacity_change"],
                    )
                } else {
                    (
                        "Schedule a capacity review; no immediate action required",
                        0.75,
                        vec!["schedule_capacity_review"],
                    )
                }
            }
            "security_event" => (
                "Isolate the affected host and hand over to the security team",
                0.9,
                vec!["isolate_host", "notify_security_team", "preserve_evidence"],
            ),
            _ => (
                "Create a ticket for manual review",
                0.6,
                vec!["create_ticket"],
            ),
        };

        Invocation {
            decision: decision.to_string(),
            confidence,
            actions: actions.into_iter().map(String::from).collect(),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn probe(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn invoke(
        &self,
        request: &OrchestrationRequest,
        settings: &ProviderSettings,
    ) -> Result<Invocation, ProviderError> {
        tracing::debug!(
            provider = %self.name,
            model = %settings.model,
            event_type = %request.event_type(),
            "Mock provider answering request"
        );
        Ok(Self::decide(request))
    }
}
