//! Dashboard-side transport to the router's HTTP API
//!
//! [`RouterApi`] mirrors the façade's queries and commands. [`HttpRouterClient`]
//! talks to a running server; [`MockFallback`] wraps any transport and serves
//! static data when a read fails, so the dashboard keeps rendering while the
//! router is down.

pub mod fallback;
pub mod http;

pub use fallback::MockFallback;
pub use http::HttpRouterClient;

use crate::api::{ConfigureRequest, ConfigureResponse, DecisionQuery};
use crate::orchestration::{DecisionPage, OrchestrationOutcome, OrchestrationRequest};
use crate::router::{HealthView, ProvidersView};
use async_trait::async_trait;
use thiserror::Error;

/// Failure of one call through a [`RouterApi`] transport
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("request to router failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The router answered with an error payload
    #[error("router returned HTTP {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("invalid router URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ClientError {
    /// Machine-readable error code reported by the router, if any
    pub fn api_code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[async_trait]
pub trait RouterApi: Send + Sync {
    async fn get_providers(&self) -> ClientResult<ProvidersView>;

    async fn get_health(&self) -> ClientResult<HealthView>;

    async fn refresh_health(&self, provider: Option<&str>) -> ClientResult<HealthView>;

    async fn configure_provider(
        &self,
        request: &ConfigureRequest,
    ) -> ClientResult<ConfigureResponse>;

    async fn run_orchestration(
        &self,
        request: &OrchestrationRequest,
    ) -> ClientResult<OrchestrationOutcome>;

    async fn get_decisions(&self, query: &DecisionQuery) -> ClientResult<DecisionPage>;
}
