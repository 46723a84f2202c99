//! Local Ollama provider
//!
//! Probes the native `/api/tags` endpoint and invokes models through the
//! OpenAI-compatible `/v1` surface using open-agent-sdk.

use crate::error::ProviderError;
use crate::orchestration::OrchestrationRequest;
use crate::providers::{
    Invocation, Provider, ProviderSettings, check_status, prompt, transport_error,
};
use async_trait::async_trait;

pub struct OllamaProvider {
    name: String,
    base_url: String,
    http: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            http,
        }
    }

    fn agent_options(
        &self,
        settings: &ProviderSettings,
    ) -> Result<open_agent::AgentOptions, ProviderError> {
        let api_url = format!("{}/v1", self.base_url);
        open_agent::AgentOptions::builder()
            .model(settings.model.as_str())
            .base_url(api_url.as_str())
            .max_tokens(settings.max_tokens)
            .temperature(settings.temperature as f32)
            .build()
            .map_err(|e| {
                tracing::error!(
                    provider = %self.name,
                    base_url = %self.base_url,
                    model = %settings.model,
                    error = %e,
                    "Failed to build AgentOptions for provider invocation"
                );
                ProviderError::InvalidResponse {
                    provider: self.name.clone(),
                    reason: format!("invalid agent options: {}", e),
                }
            })
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn probe(&self) -> Result<(), ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error(&self.name, e))?;
        check_status(&self.name, response)?;
        Ok(())
    }

    async fn invoke(
        &self,
        request: &OrchestrationRequest,
        settings: &ProviderSettings,
    ) -> Result<Invocation, ProviderError> {
        use futures::StreamExt;
        use open_agent::ContentBlock;

        let options = self.agent_options(settings)?;
        let user_prompt = format!(
            "{}\n\n{}",
            prompt::SYSTEM_PROMPT,
            prompt::build_prompt(request)
        );

        let mut stream = open_agent::query(&user_prompt, &options)
            .await
            .map_err(|e| ProviderError::Connection {
                provider: self.name.clone(),
                reason: e.to_string(),
            })?;

        let mut response_text = String::new();
        while let Some(block) = stream.next().await {
            match block {
                Ok(block) => {
                    if let ContentBlock::Text(text_block) = block {
                        prompt::append_chunk(&self.name, &mut response_text, &text_block.text)?;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        provider = %self.name,
                        error = %e,
                        bytes_received = response_text.len(),
                        "Provider stream failed mid-response"
                    );
                    return Err(ProviderError::Connection {
                        provider: self.name.clone(),
                        reason: format!("stream error after {} bytes: {}", response_text.len(), e),
                    });
                }
            }
        }

        prompt::parse_response(&self.name, &response_text)
    }
}
