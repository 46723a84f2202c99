//! OpenAI chat-completions provider

use crate::error::ProviderError;
use crate::orchestration::OrchestrationRequest;
use crate::providers::{
    Invocation, Provider, ProviderSettings, check_status, prompt, transport_error,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub struct OpenAiProvider {
    name: String,
    base_url: String,
    api_key: Option<String>,
    api_key_env: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiProvider {
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

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ProviderError::MissingApiKey {
                provider: self.name.clone(),
                env_var: self.api_key_env.clone(),
            })
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn probe(&self) -> Result<(), ProviderError> {
        let api_key = self.api_key()?;
        let response = self
            .http
            .get(format!("{}/models", self.base_url))
            .bearer_auth(api_key)
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
        let api_key = self.api_key()?;
        let user_prompt = prompt::build_prompt(request);

        let body = ChatRequest {
            model: &settings.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt::SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&self.name, e))?;
        let response = check_status(&self.name, response)?;

        let completion: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse {
                    provider: self.name.clone(),
                    reason: format!("unexpected completion payload: {}", e),
                })?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::EmptyResponse {
                provider: self.name.clone(),
            })?;

        prompt::parse_response(&self.name, &text)
    }
}
