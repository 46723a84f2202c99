//! Liveness endpoint
//!
//! Answers as long as the process is serving HTTP; provider health lives
//! under `/api/health`.

use axum::{Json, http::StatusCode};
use serde::Serialize;

/// Liveness response
#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
}

pub async fn handler() -> (StatusCode, Json<LivenessResponse>) {
    (StatusCode::OK, Json(LivenessResponse { status: "OK" }))
}
