//! Anthropic Messages API provider

use crate::error::ProviderError;
use crate::orchestration::OrchestrationRequest;
use crate::providers::{
    Invocation, Provider, ProviderSettings, check_status, prompt, transport_error,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    name: String,
    base_url: String,
    api_key: Option<String>,
    api_key_env: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'static str,
    messages: Vec<Message<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        api_key_env: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key,
            api_key_env: api_key_env.into(),
            http,
        }
    }

    fn authorized(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::MissingApiKey {
                provider: self.name.clone(),
                env_var: self.api_key_env.clone(),
            })?;
        Ok(builder
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION))
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn probe(&self) -> Result<(), ProviderError> {
        let response = self
            .authorized(self.http.get(format!("{}/models", self.base_url)))?
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
        let user_prompt = prompt::build_prompt(request);
        let body = MessagesRequest {
            model: &settings.model,
            system: prompt::SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: &user_prompt,
            }],
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        };

        let response = self
            .authorized(self.http.post(format!("{}/messages", self.base_url)))?
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&self.name, e))?;
        let response = check_status(&self.name, response)?;

        let message: MessagesResponse =
            response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse {
                    provider: self.name.clone(),
                    reason: format!("unexpected messages payload: {}", e),
                })?;

        let text: String = message
            .content
            .into_iter()
            .filter(|part| part.kind == "text")
            .filter_map(|part| part.text)
            .collect();

        prompt::parse_response(&self.name, &text)
    }
}
