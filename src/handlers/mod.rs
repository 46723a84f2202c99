//! HTTP request handlers for the opsroute API

use crate::metrics::Metrics;
use crate::middleware::request_id::request_id_middleware;
use crate::router::AgentRouter;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod decisions;
pub mod extractor;
pub mod health;
pub mod metrics;
pub mod orchestrate;
pub mod provider_health;
pub mod providers;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    router: Arc<AgentRouter>,
}

impl AppState {
    pub fn new(router: Arc<AgentRouter>) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &AgentRouter {
        &self.router
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.router.metrics()
    }
}

/// Build the complete HTTP application
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::handler))
        .route("/metrics", get(metrics::handler))
        .route("/api/providers", get(providers::list))
        .route("/api/providers/configure", post(providers::configure))
        .route("/api/health", get(provider_health::snapshot))
        .route("/api/health/refresh", post(provider_health::refresh))
        .route("/api/orchestrate", post(orchestrate::handler))
        .route("/api/decisions", get(decisions::handler))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state)
}
