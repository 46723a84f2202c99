//! JSON extractor with API-shaped error responses
//!
//! Wraps Axum's `Json` extractor so malformed bodies are reported with the
//! same `{status, error, message}` payload as every other API error.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

/// Rejection for [`ApiJson`]
///
/// - JSON syntax and data errors → 400 Bad Request
/// - Missing content type → 415 Unsupported Media Type
#[derive(Debug)]
pub struct ApiJsonRejection(JsonRejection);

impl IntoResponse for ApiJsonRejection {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            JsonRejection::MissingJsonContentType(_) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Content-Type must be application/json".to_string(),
            ),
            _ => (StatusCode::BAD_REQUEST, self.0.body_text()),
        };

        tracing::debug!(status = %status, message = %message, "Rejected request body");

        let body = Json(serde_json::json!({
            "status": "error",
            "error": "invalid_request",
            "message": message,
        }));
        (status, body).into_response()
    }
}

/// `Json<T>` replacement for API handlers
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiJsonRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiJsonRejection(rejection)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header::CONTENT_TYPE;

    #[derive(serde::Deserialize)]
    struct Payload {
        #[allow(dead_code)]
        name: String,
    }

    async fn extract(request: Request) -> Result<ApiJson<Payload>, ApiJsonRejection> {
        ApiJson::<Payload>::from_request(request, &()).await
    }

    #[tokio::test]
    async fn test_syntax_error_is_bad_request() {
        let request = Request::builder()
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let rejection = extract(request).await.err().unwrap();
        assert_eq!(rejection.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_content_type_is_unsupported_media_type() {
        let request = Request::builder()
            .body(Body::from(r#"{"name":"x"}"#))
            .unwrap();
        let rejection = extract(request).await.err().unwrap();
        assert_eq!(
            rejection.into_response().status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }

    #[tokio::test]
    async fn test_valid_body_extracts() {
        let request = Request::builder()
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"x"}"#))
            .unwrap();
        assert!(extract(request).await.is_ok());
    }
}
