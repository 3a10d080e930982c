//! Upstream forwarding handlers

use super::GatewayState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

/// Failures talking to the backend, rendered as `502 Bad Gateway`
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Proxy error: {0}")]
    Proxy(String),
    #[error("API unreachable")]
    Unreachable,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = match self {
            GatewayError::Proxy(message) => json!({ "error": "Proxy error", "message": message }),
            GatewayError::Unreachable => json!({ "error": "API unreachable" }),
        };
        (StatusCode::BAD_GATEWAY, Json(body)).into_response()
    }
}

/// Forward any `/api/*` request verbatim and relay the backend's answer
pub async fn forward_api(
    State(state): State<GatewayState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let path = uri.path_and_query().map_or(uri.path(), |pq| pq.as_str());
    let target_url = format!("{}{path}", state.api_target);
    tracing::info!(method = %method, path = %path, target = %target_url, "Proxying");

    let mut request = state.client.request(method, &target_url);
    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        request = request.header(header::CONTENT_TYPE, content_type);
    }
    if !body.is_empty() {
        request = request.body(body);
    }

    let upstream = request.send().await.map_err(|e| {
        tracing::error!(target = %target_url, error = %e, "Proxy error");
        GatewayError::Proxy(e.to_string())
    })?;

    let status = upstream.status();
    let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
    let bytes = upstream.bytes().await.map_err(|e| {
        tracing::error!(target = %target_url, error = %e, "Proxy error reading body");
        GatewayError::Proxy(e.to_string())
    })?;

    let mut response = (status, bytes).into_response();
    match content_type {
        Some(value) => {
            response.headers_mut().insert(header::CONTENT_TYPE, value);
        }
        None => {
            response.headers_mut().remove(header::CONTENT_TYPE);
        }
    }
    Ok(response)
}

/// Forward the backend's health check
pub async fn forward_health(State(state): State<GatewayState>) -> Result<Response, GatewayError> {
    let target_url = format!("{}/health", state.api_target);

    let upstream = state.client.get(&target_url).send().await.map_err(|e| {
        tracing::warn!(target = %target_url, error = %e, "API unreachable");
        GatewayError::Unreachable
    })?;
    let status = upstream.status();
    let payload: Value = upstream.json().await.map_err(|e| {
        tracing::warn!(target = %target_url, error = %e, "Health payload unreadable");
        GatewayError::Unreachable
    })?;

    Ok((status, Json(payload)).into_response())
}
