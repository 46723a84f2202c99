//! Request and response bodies of the HTTP API
//!
//! Shared by the axum handlers and the dashboard-side [`crate::client`].

use crate::orchestration::DecisionFilter;
use crate::providers::{ProviderOptions, ProviderSettings};
use serde::{Deserialize, Serialize};

/// Page size used by `GET /api/decisions` when no limit is given
pub const DEFAULT_DECISION_LIMIT: usize = 50;

/// Body of `POST /api/providers/configure`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigureRequest {
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub options: ProviderOptions,
}

/// Successful reply of `POST /api/providers/configure`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigureResponse {
    pub status: String,
    pub message: String,
    pub config: ProviderSettings,
}

impl ConfigureResponse {
    pub fn success(provider: &str, config: ProviderSettings) -> Self {
        Self {
            status: "success".to_string(),
            message: format!("Provider '{}' now uses model '{}'", provider, config.model),
            config,
        }
    }
}

/// Body of `POST /api/health/refresh`; an absent provider refreshes all
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// Query string of `GET /api/decisions`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl From<DecisionQuery> for DecisionFilter {
    fn from(query: DecisionQuery) -> Self {
        DecisionFilter {
            event_type: query.event_type.filter(|e| !e.trim().is_empty()),
            limit: Some(query.limit.unwrap_or(DEFAULT_DECISION_LIMIT)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decision_query_defaults_limit() {
        let filter = DecisionFilter::from(DecisionQuery::default());
        assert_eq!(filter.limit, Some(DEFAULT_DECISION_LIMIT));
        assert_eq!(filter.event_type, None);
    }

    #[test]
    fn test_blank_event_type_means_all() {
        let filter = DecisionFilter::from(DecisionQuery {
            event_type: Some(" ".to_string()),
            limit: Some(5),
        });
        assert_eq!(filter.event_type, None);
        assert_eq!(filter.limit, Some(5));
    }

    #[test]
    fn test_configure_request_options_are_optional() {
        let request: ConfigureRequest =
            serde_json::from_value(json!({"provider": "ollama", "model": "llama2-7b"})).unwrap();
        assert_eq!(request.options, ProviderOptions::default());
    }
}
