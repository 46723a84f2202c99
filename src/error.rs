//! Error types for opsroute
//!
//! - [`AppError`]: process-level failures (configuration loading, server start-up)
//! - [`RouterError`]: per-request failures surfaced by the router façade
//! - [`ProviderError`]: failures of a single probe or invocation against one provider
//!
//! `RouterError` implements `IntoResponse` for Axum handlers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Process-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file '{path}': {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in '{path}': {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Failed to initialize metrics: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

/// Convenience type alias for process-level Results
pub type AppResult<T> = Result<T, AppError>;

/// Failure of a single provider probe or invocation
///
/// Probe failures never leave the health monitor; invocation failures are
/// wrapped into [`RouterError::ExecutionError`] once all attempts are spent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{provider} did not respond within {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },

    #[error("connection to {provider} failed: {reason}")]
    Connection { provider: String, reason: String },

    #[error("{provider} returned HTTP {status}")]
    HttpStatus { provider: String, status: u16 },

    #[error("{provider} returned an empty response")]
    EmptyResponse { provider: String },

    #[error("{provider} response exceeded {max_bytes} bytes (got {size})")]
    ResponseTooLarge {
        provider: String,
        size: usize,
        max_bytes: usize,
    },

    #[error("{provider} returned an invalid response: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("API key for {provider} not found in environment variable {env_var}")]
    MissingApiKey { provider: String, env_var: String },

    #[error("{provider} failed: {reason}")]
    Injected { provider: String, reason: String },
}

impl ProviderError {
    /// Short label used for metrics and health messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Connection { .. } => "connection",
            Self::HttpStatus { .. } => "http_status",
            Self::EmptyResponse { .. } => "empty_response",
            Self::ResponseTooLarge { .. } => "response_too_large",
            Self::InvalidResponse { .. } => "invalid_response",
            Self::MissingApiKey { .. } => "missing_api_key",
            Self::Injected { .. } => "injected",
        }
    }
}

/// Errors returned by the router façade to its callers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouterError {
    #[error("Unknown provider '{name}'. Available providers: {available}")]
    UnknownProvider { name: String, available: String },

    #[error("Model '{model}' is not supported by provider '{provider}'. Supported models: {supported}")]
    UnsupportedModel {
        provider: String,
        model: String,
        supported: String,
    },

    #[error("Invalid options for provider '{provider}': {reason}")]
    InvalidOptions { provider: String, reason: String },

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("No healthy provider available ({checked} checked, {excluded} excluded)")]
    NoHealthyProvider { checked: usize, excluded: usize },

    #[error("Provider '{name}' is unavailable (status: unhealthy)")]
    ProviderUnavailable { name: String },

    #[error("Orchestration failed after {attempts} attempt(s): {last_error}")]
    ExecutionError {
        attempts: usize,
        last_error: ProviderError,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RouterError {
    /// Stable machine-readable error code for API payloads
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownProvider { .. } => "unknown_provider",
            Self::UnsupportedModel { .. } => "unsupported_model",
            Self::InvalidOptions { .. } => "invalid_options",
            Self::Validation(_) => "invalid_request",
            Self::NoHealthyProvider { .. } => "no_healthy_provider",
            Self::ProviderUnavailable { .. } => "provider_unavailable",
            Self::ExecutionError { .. } => "execution_error",
            Self::Internal(_) => "internal",
        }
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UnknownProvider { .. } => StatusCode::NOT_FOUND,
            Self::UnsupportedModel { .. } | Self::InvalidOptions { .. } | Self::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NoHealthyProvider { .. } | Self::ProviderUnavailable { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::ExecutionError { .. } => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RouterError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "status": "error",
            "error": self.code(),
            "message": self.to_string(),
        }));

        (self.status_code(), body).into_response()
    }
}

/// Convenience type alias for façade Results
pub type RouterResult<T> = Result<T, RouterError>;
