use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the scoring core and its outer shell.
///
/// Network-class failures never appear here: the provider clients turn them
/// into degraded readings (see [`DegradationReason`]).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("Unknown protocol: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    /// True for failures caused by configuration rather than upstream data,
    /// including an identifier missing from the registry.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, AppError::NotFound(_) | AppError::ConfigError(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::InternalError(format!("HTTP client error: {}", err))
    }
}

impl From<prometheus::Error> for AppError {
    fn from(err: prometheus::Error) -> Self {
        AppError::InternalError(format!("Prometheus metrics error: {}", err))
    }
}

/// Failure of a single upstream request. Recovered inside the client that
/// produced it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpstreamError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    MalformedData(String),
}

impl UpstreamError {
    /// Classify a reqwest failure. `timeout_secs` is only used for the message.
    pub fn from_reqwest(err: &reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout(timeout_secs)
        } else if err.is_decode() {
            UpstreamError::MalformedData(err.to_string())
        } else if let Some(status) = err.status() {
            UpstreamError::HttpStatus { status: status.as_u16(), body: String::new() }
        } else {
            UpstreamError::Transport(err.to_string())
        }
    }
}

/// Why a reading holds substituted rather than live data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DegradationReason {
    Timeout,
    HttpStatus(u16),
    Transport,
    MalformedData,
    MissingField(String),
}

impl From<&UpstreamError> for DegradationReason {
    fn from(err: &UpstreamError) -> Self {
        match err {
            UpstreamError::Timeout(_) => DegradationReason::Timeout,
            UpstreamError::HttpStatus { status, .. } => DegradationReason::HttpStatus(*status),
            UpstreamError::Transport(_) => DegradationReason::Transport,
            UpstreamError::MalformedData(_) => DegradationReason::MalformedData,
        }
    }
}

impl std::fmt::Display for DegradationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DegradationReason::Timeout => write!(f, "request timed out"),
            DegradationReason::HttpStatus(status) => write!(f, "provider returned HTTP {}", status),
            DegradationReason::Transport => write!(f, "provider unreachable"),
            DegradationReason::MalformedData => write!(f, "provider returned malformed data"),
            DegradationReason::MissingField(field) => write!(f, "field '{}' missing from provider response", field),
        }
    }
}
