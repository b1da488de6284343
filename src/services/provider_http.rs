use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AppError, UpstreamError};

pub const USER_AGENT: &str = "DeFi-Risk-Gauge/1.0";
const ERROR_BODY_PREVIEW: usize = 200;

pub fn build_client(timeout: Duration) -> Result<Client, AppError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| AppError::ConfigError(format!("Failed to create HTTP client: {}", e)))
}

/// One GET with no retry. Any non-2xx status, transport failure, timeout or
/// non-JSON body is returned as an [`UpstreamError`].
pub async fn get_json(
    client: &Client,
    provider: &str,
    url: &str,
    query: &[(&str, &str)],
    headers: &[(&str, &str)],
    timeout: Duration,
) -> Result<Value, UpstreamError> {
    debug!(provider, url, "Sending provider request");

    let mut request = client
        .get(url)
        .query(query)
        .header(reqwest::header::ACCEPT, "application/json");
    for (name, value) in headers {
        request = request.header(*name, *value);
    }

    let response = request
        .send()
        .await
        .map_err(|e| UpstreamError::from_reqwest(&e, timeout.as_secs()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
        warn!(provider, url, status = status.as_u16(), body = %preview, "Non-OK provider response");
        return Err(UpstreamError::HttpStatus {
            status: status.as_u16(),
            body: preview,
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| UpstreamError::from_reqwest(&e, timeout.as_secs()))?;

    serde_json::from_str(&body).map_err(|e| UpstreamError::MalformedData(e.to_string()))
}

/// Label used for the upstream request counter.
pub fn outcome_label(result: &Result<Value, UpstreamError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(UpstreamError::Timeout(_)) => "timeout",
        Err(UpstreamError::HttpStatus { .. }) => "http_error",
        Err(UpstreamError::Transport(_)) => "transport_error",
        Err(UpstreamError::MalformedData(_)) => "malformed",
    }
}

/// Numeric JSON value, also accepting numeric strings. Non-finite values are
/// rejected.
pub fn as_finite_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}
