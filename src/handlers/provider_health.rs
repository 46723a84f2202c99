//! Provider health endpoints

use crate::api::RefreshRequest;
use crate::error::RouterError;
use crate::handlers::AppState;
use crate::router::HealthView;
use axum::{Json, body::Bytes, extract::State};

/// `GET /api/health`
pub async fn snapshot(State(state): State<AppState>) -> Json<HealthView> {
    Json(state.router().get_health())
}

/// `POST /api/health/refresh`
///
/// An empty body refreshes every provider.
pub async fn refresh(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<HealthView>, RouterError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        RefreshRequest::default()
    } else {
        serde_json::from_slice::<RefreshRequest>(&body)
            .map_err(|e| RouterError::Validation(format!("invalid refresh body: {}", e)))?
    };

    let provider = request.provider.as_deref().filter(|p| !p.trim().is_empty());
    Ok(Json(state.router().refresh_health(provider).await?))
}
