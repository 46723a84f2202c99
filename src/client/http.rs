//! reqwest transport for the router's HTTP API

use crate::api::{ConfigureRequest, ConfigureResponse, DecisionQuery, RefreshRequest};
use crate::client::{ClientError, ClientResult, RouterApi};
use crate::orchestration::{DecisionPage, OrchestrationOutcome, OrchestrationRequest};
use crate::router::{HealthView, ProvidersView};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Client for a running opsroute server
#[derive(Debug, Clone)]
pub struct HttpRouterClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpRouterClient {
    /// Client with its own connection pool and a 30s request timeout
    ///
    /// # Errors
    /// `InvalidUrl` unless `base_url` is an http(s) URL; `Transport` if the
    /// HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Self::with_client(base_url, http)
    }

    /// Client sharing an existing reqwest pool
    ///
    /// # Errors
    /// `InvalidUrl` unless `base_url` is an http(s) URL.
    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> ClientResult<Self> {
        let base_url = base_url.into();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ClientError::InvalidUrl {
                url: base_url,
                reason: "must start with http:// or https://".to_string(),
            });
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Decode a success body, or turn an error payload into `ClientError::Api`
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    let code = body
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("http_error")
        .to_string();
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    tracing::debug!(
        status = status.as_u16(),
        code = %code,
        message = %message,
        "Router returned an error"
    );

    Err(ClientError::Api {
        status: status.as_u16(),
        code,
        message,
    })
}

#[async_trait]
impl RouterApi for HttpRouterClient {
    async fn get_providers(&self) -> ClientResult<ProvidersView> {
        decode(self.http.get(self.url("/api/providers")).send().await?).await
    }

    async fn get_health(&self) -> ClientResult<HealthView> {
        decode(self.http.get(self.url("/api/health")).send().await?).await
    }

    async fn refresh_health(&self, provider: Option<&str>) -> ClientResult<HealthView> {
        let body = RefreshRequest {
            provider: provider.map(str::to_string),
        };
        let response = self
            .http
            .post(self.url("/api/health/refresh"))
            .json(&body)
            .send()
            .await?;
        decode(response).await
    }

    async fn configure_provider(
        &self,
        request: &ConfigureRequest,
    ) -> ClientResult<ConfigureResponse> {
        let response = self
            .http
            .post(self.url("/api/providers/configure"))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    async fn run_orchestration(
        &self,
        request: &OrchestrationRequest,
    ) -> ClientResult<OrchestrationOutcome> {
        let response = self
            .http
            .post(self.url("/api/orchestrate"))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    async fn get_decisions(&self, query: &DecisionQuery) -> ClientResult<DecisionPage> {
        let response = self
            .http
            .get(self.url("/api/decisions"))
            .query(query)
            .send()
            .await?;
        decode(response).await
    }
}
