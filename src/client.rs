//! Market backend API client
//!
//! A stateless wrapper over the backend's session, message and market
//! endpoints. Responses are decoded but not interpreted.

pub mod deadline;
mod error;
mod http;
mod types;

pub use deadline::with_deadline;
pub use error::{ApiError, ApiErrorKind, TIMEOUT_MESSAGE};
pub use http::HttpMarketApi;
pub use types::*;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Operations offered by the market backend
#[async_trait]
pub trait MarketApi: Send + Sync {
    /// Register a client-generated session id with the backend
    async fn create_session(&self, session_id: &str, metadata: &Value) -> Result<Value, ApiError>;

    /// Send a chat message. Fails with a timeout error once the configured
    /// deadline elapses, or a cancelled error once `cancel` fires.
    async fn send_message(
        &self,
        session_id: &str,
        message: &str,
        cancel: CancellationToken,
    ) -> Result<MessageReply, ApiError>;

    /// Fetch a session descriptor; `None` when the backend does not know it
    async fn get_session(&self, session_id: &str) -> Result<Option<Value>, ApiError>;

    /// Submit a generated market for publication
    async fn submit_market(
        &self,
        market_id: &str,
        request: &SubmitMarket,
    ) -> Result<SubmitResponse, ApiError>;

    /// Best-effort liveness check, never fails
    async fn check_health(&self) -> bool;

    /// Describe where requests go (for diagnostics)
    fn api_url(&self) -> String;
}

#[async_trait]
impl<T: MarketApi + ?Sized> MarketApi for Arc<T> {
    async fn create_session(&self, session_id: &str, metadata: &Value) -> Result<Value, ApiError> {
        (**self).create_session(session_id, metadata).await
    }

    async fn send_message(
        &self,
        session_id: &str,
        message: &str,
        cancel: CancellationToken,
    ) -> Result<MessageReply, ApiError> {
        (**self).send_message(session_id, message, cancel).await
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Value>, ApiError> {
        (**self).get_session(session_id).await
    }

    async fn submit_market(
        &self,
        market_id: &str,
        request: &SubmitMarket,
    ) -> Result<SubmitResponse, ApiError> {
        (**self).submit_market(market_id, request).await
    }

    async fn check_health(&self) -> bool {
        (**self).check_health().await
    }

    fn api_url(&self) -> String {
        (**self).api_url()
    }
}

/// Logging wrapper for API clients
pub struct LoggingApi<A> {
    inner: A,
}

impl<A: MarketApi> LoggingApi<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }

    fn log_outcome<T>(
        operation: &str,
        session_id: &str,
        started: std::time::Instant,
        result: &Result<T, ApiError>,
    ) {
        let duration_ms = started.elapsed().as_millis();
        match result {
            Ok(_) => tracing::info!(
                operation,
                session_id,
                duration_ms = %duration_ms,
                "API request completed"
            ),
            Err(e) => tracing::error!(
                operation,
                session_id,
                duration_ms = %duration_ms,
                kind = ?e.kind,
                error = %e.message,
                "API request failed"
            ),
        }
    }
}

#[async_trait]
impl<A: MarketApi> MarketApi for LoggingApi<A> {
    async fn create_session(&self, session_id: &str, metadata: &Value) -> Result<Value, ApiError> {
        let started = std::time::Instant::now();
        let result = self.inner.create_session(session_id, metadata).await;
        Self::log_outcome("create_session", session_id, started, &result);
        result
    }

    async fn send_message(
        &self,
        session_id: &str,
        message: &str,
        cancel: CancellationToken,
    ) -> Result<MessageReply, ApiError> {
        let started = std::time::Instant::now();
        let result = self.inner.send_message(session_id, message, cancel).await;
        Self::log_outcome("send_message", session_id, started, &result);
        if let Ok(reply) = &result {
            tracing::debug!(
                session_id,
                status = ?reply.status,
                has_market = ?reply.has_market,
                "Message reply"
            );
        }
        result
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Value>, ApiError> {
        let started = std::time::Instant::now();
        let result = self.inner.get_session(session_id).await;
        Self::log_outcome("get_session", session_id, started, &result);
        result
    }

    async fn submit_market(
        &self,
        market_id: &str,
        request: &SubmitMarket,
    ) -> Result<SubmitResponse, ApiError> {
        let started = std::time::Instant::now();
        let result = self.inner.submit_market(market_id, request).await;
        Self::log_outcome("submit_market", &request.session_id, started, &result);
        result
    }

    async fn check_health(&self) -> bool {
        let healthy = self.inner.check_health().await;
        if !healthy {
            tracing::warn!(target_url = %self.inner.api_url(), "Health check failed");
        }
        healthy
    }

    fn api_url(&self) -> String {
        self.inner.api_url()
    }
}
