//! Integration tests for the HTTP API
//!
//! Requests go through the complete axum application (middleware included)
//! via `tower::ServiceExt::oneshot`; providers are scripted in-process.

mod common;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
};
use common::{ScriptedProvider, router};
use opsroute::handlers::{AppState, routes};
use opsroute::middleware::request_id::REQUEST_ID_HEADER;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    app: Router,
    ollama: Arc<ScriptedProvider>,
    mock: Arc<ScriptedProvider>,
}

fn create_app() -> TestApp {
    let ollama = ScriptedProvider::with_latency("ollama", 5);
    let mock = ScriptedProvider::with_latency("mock", 20);
    let router = router(&[ollama.clone(), mock.clone()]);
    TestApp {
        app: routes(AppState::new(Arc::new(router))),
        ollama,
        mock,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, _, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, _, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn refresh_all(app: &Router) {
    let (status, _) = post_json(app, "/api/health/refresh", json!({})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_liveness_carries_request_id() {
    let test = create_app();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, headers, body) = send(&test.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!({"status": "OK"}));
    let id = headers.get(REQUEST_ID_HEADER).expect("x-request-id header");
    assert!(uuid::Uuid::parse_str(id.to_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_incoming_request_id_is_echoed() {
    let test = create_app();
    let id = "1b4e28ba-2fa1-11d2-883f-0016d3cca427";
    let request = Request::builder()
        .uri("/api/health")
        .header(REQUEST_ID_HEADER, id)
        .body(Body::empty())
        .unwrap();

    let (_, headers, _) = send(&test.app, request).await;
    assert_eq!(headers.get(REQUEST_ID_HEADER).unwrap(), id);
}

#[tokio::test]
async fn test_get_providers_shape() {
    let test = create_app();
    let (status, body) = get_json(&test.app, "/api/providers").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["providers"], json!(["ollama", "mock"]));
    assert_eq!(body["models"]["mock"], json!(["mock-small", "mock-large"]));
    assert_eq!(body["active"]["ollama"]["model"], "ollama-small");
    assert_eq!(body["active"]["ollama"]["max_tokens"], 256);
    assert!(body["recommended"].is_object());
}

#[tokio::test]
async fn test_refresh_and_health_shape() {
    let test = create_app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/health/refresh")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&test.app, request).await;
    assert_eq!(status, StatusCode::OK);
    let refreshed: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(refreshed["status"], "ok");
    assert_eq!(refreshed["router_active"], true);

    let (status, body) = get_json(&test.app, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    let record = &body["providers"]["ollama"];
    assert_eq!(record["status"], "healthy");
    assert!(record["latency_ms"].as_u64().unwrap() >= 5);
    assert_eq!(record["error_count"], 0);
    assert_eq!(record["consecutive_failures"], 0);
    assert_eq!(record["message"], "OK");
    assert!(record["last_check_ago"].is_u64());
}

#[tokio::test]
async fn test_refresh_unknown_provider_is_not_found() {
    let test = create_app();
    let (status, body) =
        post_json(&test.app, "/api/health/refresh", json!({"provider": "llamafile"})).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"], "unknown_provider");
}

#[tokio::test]
async fn test_orchestrate_success_shape() {
    let test = create_app();
    refresh_all(&test.app).await;

    let (status, body) = post_json(
        &test.app,
        "/api/orchestrate",
        json!({"event_type": "incident", "context": {"severity": "high"}, "provider": ""}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["event_type"], "incident");
    assert_eq!(body["actions_taken"], json!(["acknowledge"]));
    let decision = &body["decisions"][0];
    assert_eq!(decision["agent_name"], "incident_triage_agent");
    assert_eq!(decision["provider"], "ollama");
    assert_eq!(decision["confidence"], 0.9);
    assert!(decision["timestamp"].is_string());
}

#[tokio::test]
async fn test_orchestrate_fallback_is_visible_in_decisions() {
    let test = create_app();
    refresh_all(&test.app).await;
    test.ollama.fail_next_invocations(1);

    let (status, body) = post_json(
        &test.app,
        "/api/orchestrate",
        json!({"event_type": "incident", "context": {}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["decisions"][0]["provider"], "mock");

    let (status, page) = get_json(&test.app, "/api/decisions?event_type=incident&limit=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["decisions"][0]["provider"], "mock");
    assert_eq!(test.mock.invoke_calls(), 1);
}

#[tokio::test]
async fn test_orchestrate_validation_errors_are_bad_request() {
    let test = create_app();

    for payload in [
        json!({"event_type": "  ", "context": {}}),
        json!({"event_type": "incident", "context": [1, 2, 3]}),
        json!({"context": {}}),
    ] {
        let (status, body) = post_json(&test.app, "/api/orchestrate", payload.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {}", payload);
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "invalid_request");
    }
    assert_eq!(test.ollama.invoke_calls() + test.mock.invoke_calls(), 0);
}

#[tokio::test]
async fn test_orchestrate_without_healthy_provider_is_unavailable() {
    let test = create_app();
    test.ollama.set_probe_failing(true);
    test.mock.set_probe_failing(true);
    for _ in 0..3 {
        refresh_all(&test.app).await;
    }

    let (status, body) = post_json(
        &test.app,
        "/api/orchestrate",
        json!({"event_type": "incident", "context": {}}),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"], "no_healthy_provider");
}

#[tokio::test]
async fn test_orchestrate_exhausted_attempts_is_bad_gateway() {
    let test = create_app();
    refresh_all(&test.app).await;
    test.ollama.fail_next_invocations(1);
    test.mock.fail_next_invocations(1);

    let (status, body) = post_json(
        &test.app,
        "/api/orchestrate",
        json!({"event_type": "capacity_alert", "context": {"utilization": 97}}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "execution_error");
    assert!(body["message"].as_str().unwrap().contains("2 attempt(s)"));
}

#[tokio::test]
async fn test_configure_success_and_error_payloads() {
    let test = create_app();

    let (status, body) = post_json(
        &test.app,
        "/api/providers/configure",
        json!({"provider": "ollama", "model": "ollama-large", "options": {"temperature": 0.2}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["config"]["model"], "ollama-large");
    assert_eq!(body["config"]["temperature"], 0.2);

    let (status, body) = post_json(
        &test.app,
        "/api/providers/configure",
        json!({"provider": "ollama", "model": "gpt-4"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"], "unsupported_model");
    assert!(body["message"].as_str().unwrap().contains("gpt-4"));

    let (_, providers) = get_json(&test.app, "/api/providers").await;
    assert_eq!(providers["active"]["ollama"]["model"], "ollama-large");
}

#[tokio::test]
async fn test_decisions_default_limit() {
    let test = create_app();
    refresh_all(&test.app).await;

    for _ in 0..55 {
        let (status, _) = post_json(
            &test.app,
            "/api/orchestrate",
            json!({"event_type": "change_request", "context": {}}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, page) = get_json(&test.app, "/api/decisions").await;
    assert_eq!(page["total"], 55);
    assert_eq!(page["decisions"].as_array().unwrap().len(), 50);
    assert_eq!(page["decisions"][0]["agent_name"], "change_advisory_agent");
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_router_metrics() {
    let test = create_app();
    refresh_all(&test.app).await;

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let (status, _, body) = send(&test.app, request).await;

    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("opsroute_probes_total"));
    assert!(text.contains("opsroute_health_transitions_total"));
}
