//! Orchestration endpoint
//!
//! Validation happens during deserialization: a blank `event_type` or a
//! non-object `context` is rejected before any provider is selected.

use crate::error::RouterError;
use crate::handlers::AppState;
use crate::handlers::extractor::ApiJson;
use crate::middleware::request_id::RequestId;
use crate::orchestration::{OrchestrationOutcome, OrchestrationRequest};
use axum::{Extension, Json, extract::State};

/// `POST /api/orchestrate`
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiJson(request): ApiJson<OrchestrationRequest>,
) -> Result<Json<OrchestrationOutcome>, RouterError> {
    tracing::info!(
        request_id = %request_id,
        event_type = %request.event_type(),
        provider_override = ?request.provider(),
        "Received orchestration request"
    );

    let outcome = state
        .router()
        .run_orchestration(request)
        .await
        .inspect_err(|e| {
            tracing::warn!(
                request_id = %request_id,
                error = %e,
                error_code = e.code(),
                "Orchestration request failed"
            );
        })?;

    Ok(Json(outcome))
}
