//! Provider invocation interface and concrete provider clients
//!
//! Every language-model backend is reached through the [`Provider`] trait so the
//! health monitor and executor never depend on a particular wire protocol.

pub mod anthropic;
pub mod mock;
pub mod name;
pub mod ollama;
pub mod openai;
pub mod prompt;
pub mod registry;

pub use name::{ExclusionSet, ProviderName};
pub use registry::{
    ProviderDescriptor, ProviderOptions, ProviderRegistry, ProviderSettings, RegistryEntry,
};

use crate::config::{ProviderConfig, ProviderKind};
use crate::error::ProviderError;
use crate::orchestration::OrchestrationRequest;
use async_trait::async_trait;
use std::sync::Arc;

/// Result of one successful provider invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Recommended course of action, as produced by the model
    pub decision: String,
    /// Model-reported confidence; clamped to [0.0, 1.0] when recorded
    pub confidence: f64,
    /// Follow-up actions suggested alongside the decision
    pub actions: Vec<String>,
}

/// Uniform interface to an external language-model provider
///
/// Implementations must not apply their own retry logic: timeouts and fallback
/// are owned by the health monitor and the executor.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Lightweight reachability check
    async fn probe(&self) -> Result<(), ProviderError>;

    /// Ask the provider for a decision on `request` using `settings`
    async fn invoke(
        &self,
        request: &OrchestrationRequest,
        settings: &ProviderSettings,
    ) -> Result<Invocation, ProviderError>;
}

/// Build the client for a configured provider
///
/// API keys are resolved from the environment once, at start-up.
pub fn build(config: &ProviderConfig, http: reqwest::Client) -> Arc<dyn Provider> {
    let api_key = config
        .api_key_env()
        .and_then(|var| std::env::var(var).ok())
        .filter(|key| !key.trim().is_empty());

    match config.kind() {
        ProviderKind::Mock => Arc::new(mock::MockProvider::new(config.name())),
        ProviderKind::Ollama => Arc::new(ollama::OllamaProvider::new(
            config.name(),
            config.base_url().unwrap_or_default(),
            http,
        )),
        ProviderKind::Openai => Arc::new(openai::OpenAiProvider::new(
            config.name(),
            config.base_url().unwrap_or_default(),
            api_key,
            config.api_key_env().unwrap_or_default(),
            http,
        )),
        ProviderKind::Anthropic => Arc::new(anthropic::AnthropicProvider::new(
            config.name(),
            config.base_url().unwrap_or_default(),
            api_key,
            config.api_key_env().unwrap_or_default(),
            http,
        )),
    }
}

/// Map a transport-level reqwest failure onto the provider error taxonomy
pub(crate) fn transport_error(provider: &str, error: reqwest::Error) -> ProviderError {
    ProviderError::Connection {
        provider: provider.to_string(),
        reason: error.to_string(),
    }
}

/// Turn a non-success HTTP status into a provider error
pub(crate) fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ProviderError::HttpStatus {
            provider: provider.to_string(),
            status: status.as_u16(),
        })
    }
}
