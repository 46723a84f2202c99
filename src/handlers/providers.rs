//! Provider catalog and configuration endpoints

use crate::api::{ConfigureRequest, ConfigureResponse};
use crate::error::RouterError;
use crate::handlers::AppState;
use crate::handlers::extractor::ApiJson;
use crate::router::ProvidersView;
use axum::{Json, extract::State};

/// `GET /api/providers`
pub async fn list(State(state): State<AppState>) -> Json<ProvidersView> {
    Json(state.router().get_providers())
}

/// `POST /api/providers/configure`
///
/// A rejected change leaves the provider's previous settings in place.
pub async fn configure(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ConfigureRequest>,
) -> Result<Json<ConfigureResponse>, RouterError> {
    let config =
        state
            .router()
            .configure_provider(&request.provider, &request.model, &request.options)?;

    Ok(Json(ConfigureResponse::success(&request.provider, config)))
}
