//! Decision history endpoint

use crate::api::DecisionQuery;
use crate::handlers::AppState;
use crate::orchestration::DecisionPage;
use axum::{
    Json,
    extract::{Query, State},
};

/// `GET /api/decisions?event_type=&limit=`
///
/// Most recent first; `limit` defaults to 50.
pub async fn handler(
    State(state): State<AppState>,
    Query(query): Query<DecisionQuery>,
) -> Json<DecisionPage> {
    Json(state.router().get_decisions(query.into()).await)
}
