//! Orchestration: requests, decisions, provider selection and execution
//!
//! - [`selector`]: pure ranking of providers from a health snapshot
//! - [`executor`]: invocation with timeout and a single fallback attempt
//! - [`decision_log`]: bounded in-memory history of successful decisions

pub mod decision_log;
pub mod executor;
pub mod selector;

pub use decision_log::{DecisionFilter, DecisionLog, DecisionPage};
pub use executor::Executor;

use crate::error::{RouterError, RouterResult};
use crate::providers::Invocation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Agent responsible for an event type
pub fn agent_for_event(event_type: &str) -> &'static str {
    match event_type {
        "incident" => "incident_triage_agent",
        "capacity_alert" => "capacity_planning_agent",
        "security_event" => "security_response_agent",
        "change_request" => "change_advisory_agent",
        _ => "service_desk_agent",
    }
}

/// A request to have an agent decide on an operational event
///
/// Deserialization validates the payload: `event_type` must be non-empty and
/// `context`, when present, must be a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawOrchestrationRequest")]
pub struct OrchestrationRequest {
    event_type: String,
    context: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<String>,
}

#[derive(Deserialize)]
struct RawOrchestrationRequest {
    event_type: String,
    #[serde(default)]
    context: Option<Value>,
    #[serde(default)]
    provider: Option<String>,
}

impl TryFrom<RawOrchestrationRequest> for OrchestrationRequest {
    type Error = String;

    fn try_from(raw: RawOrchestrationRequest) -> Result<Self, Self::Error> {
        let context = raw.context.unwrap_or(Value::Null);
        let mut request = Self::validated(raw.event_type, context)?;
        // The dashboard sends "" for automatic selection
        request.provider = raw.provider.filter(|p| !p.trim().is_empty());
        Ok(request)
    }
}

impl OrchestrationRequest {
    /// Create a request without a provider override
    ///
    /// # Errors
    /// Returns `RouterError::Validation` for a blank event type or a
    /// non-object context.
    pub fn new(event_type: impl Into<String>, context: Value) -> RouterResult<Self> {
        Self::validated(event_type.into(), context).map_err(RouterError::Validation)
    }

    fn validated(event_type: String, context: Value) -> Result<Self, String> {
        let event_type = event_type.trim().to_string();
        if event_type.is_empty() {
            return Err("event_type must not be empty".to_string());
        }

        let context = match context {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(format!(
                    "context must be a JSON object, got {}",
                    json_type_name(&other)
                ));
            }
        };

        Ok(Self {
            event_type,
            context,
            provider: None,
        })
    }

    /// Pin the request to one provider
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Copy of this request with the provider override removed
    pub fn without_override(&self) -> Self {
        Self {
            event_type: self.event_type.clone(),
            context: self.context.clone(),
            provider: None,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    /// Provider override, if any
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A recorded agent decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub agent_name: String,
    pub event_type: String,
    pub decision: String,
    pub timestamp: DateTime<Utc>,
    /// Always within [0.0, 1.0]
    pub confidence: f64,
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub actions_taken: Vec<String>,
}

impl Decision {
    /// Build the decision for a completed invocation
    pub fn new(
        request: &OrchestrationRequest,
        provider: &str,
        model: &str,
        invocation: Invocation,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            agent_name: agent_for_event(request.event_type()).to_string(),
            event_type: request.event_type().to_string(),
            decision: invocation.decision,
            timestamp,
            confidence: clamp_confidence(invocation.confidence),
            provider: provider.to_string(),
            model: model.to_string(),
            actions_taken: invocation.actions,
        }
    }
}

/// Clamp a model-reported confidence into [0.0, 1.0]; NaN becomes 0.0
pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Successful orchestration as returned to the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationOutcome {
    pub status: String,
    pub event_type: String,
    pub decisions: Vec<Decision>,
    pub actions_taken: Vec<String>,
}

impl From<Decision> for OrchestrationOutcome {
    fn from(decision: Decision) -> Self {
        Self {
            status: "success".to_string(),
            event_type: decision.event_type.clone(),
            actions_taken: decision.actions_taken.clone(),
            decisions: vec![decision],
        }
    }
}
