//! reqwest-backed implementation of [`MarketApi`]

use super::deadline::with_deadline;
use super::types::{
    CreateSessionRequest, MessageReply, SendMessageRequest, SubmitMarket, SubmitResponse,
};
use super::{ApiError, MarketApi};
use crate::config::{ApiTarget, ClientConfig};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// HTTP client for the market backend
#[derive(Clone)]
pub struct HttpMarketApi {
    client: Client,
    target: ApiTarget,
    send_timeout: Duration,
    health_timeout: Duration,
}

impl HttpMarketApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        // No client-wide timeout: each operation sets its own budget
        let client = Client::builder()
            .build()
            .map_err(|e| ApiError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            target: config.target.clone(),
            send_timeout: config.send_timeout,
            health_timeout: config.health_timeout,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let base = self.target.base_url();
        let mut url = Url::parse(base)
            .map_err(|e| ApiError::network(format!("Invalid API URL {base}: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::network(format!("Invalid API URL {base}")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn post_message(&self, url: Url, message: &str) -> Result<MessageReply, ApiError> {
        let response = self
            .client
            .post(url)
            .json(&SendMessageRequest { message })
            .send()
            .await
            .map_err(|e| ApiError::from_transport("send message", &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::status(
                status.as_u16(),
                format!("Failed to send message: {}", status.as_u16()),
            ));
        }

        decode("send message", response).await
    }
}

async fn decode<T: DeserializeOwned>(context: &str, response: Response) -> Result<T, ApiError> {
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::from_transport(context, &e))?;
    serde_json::from_str(&body)
        .map_err(|e| ApiError::decode(format!("{context}: failed to parse response: {e}")))
}

#[async_trait]
impl MarketApi for HttpMarketApi {
    async fn create_session(&self, session_id: &str, metadata: &Value) -> Result<Value, ApiError> {
        let url = self.endpoint(&["api", "v1", "sessions"])?;
        let response = self
            .client
            .post(url)
            .json(&CreateSessionRequest {
                client_session_id: session_id,
                metadata,
            })
            .send()
            .await
            .map_err(|e| ApiError::from_transport("create session", &e))?;

        // Status is not inspected; the caller decides what the payload means
        decode("create session", response).await
    }

    async fn send_message(
        &self,
        session_id: &str,
        message: &str,
        cancel: CancellationToken,
    ) -> Result<MessageReply, ApiError> {
        let url = self.endpoint(&["api", "v1", "sessions", session_id, "messages"])?;
        with_deadline(self.post_message(url, message), self.send_timeout, &cancel).await
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Value>, ApiError> {
        let url = self.endpoint(&["api", "v1", "sessions", session_id])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::from_transport("get session", &e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ApiError::status(
                status.as_u16(),
                format!("Failed to get session: {}", status.as_u16()),
            ));
        }

        decode("get session", response).await.map(Some)
    }

    async fn submit_market(
        &self,
        market_id: &str,
        request: &SubmitMarket,
    ) -> Result<SubmitResponse, ApiError> {
        let url = self.endpoint(&["api", "v1", "markets", market_id, "submit"])?;
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::from_transport("submit market", &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::status(
                status.as_u16(),
                format!("Failed to submit market: {}", status.as_u16()),
            ));
        }

        decode("submit market", response).await
    }

    async fn check_health(&self) -> bool {
        let Ok(url) = self.endpoint(&["health"]) else {
            return false;
        };
        self.client
            .get(url)
            .timeout(self.health_timeout)
            .send()
            .await
            .is_ok_and(|r| r.status().is_success())
    }

    fn api_url(&self) -> String {
        self.target.describe()
    }
}
