//! Reverse-proxy gateway
//!
//! Forwards `/api/*` and `/health` to the configured backend and serves the
//! built single-page application for everything else.

mod assets;
mod proxy;

pub use proxy::GatewayError;

use crate::config::GatewayConfig;
use axum::routing::{any, get};
use axum::Router;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// State shared across proxy handlers
#[derive(Clone)]
pub struct GatewayState {
    pub client: reqwest::Client,
    /// Backend origin, without trailing slash
    pub api_target: Arc<str>,
}

impl GatewayState {
    pub fn new(config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .build()?;
        Ok(Self {
            client,
            api_target: Arc::from(config.api_target.as_str()),
        })
    }
}

/// Build the gateway router with its middleware stack
pub fn create_router(config: &GatewayConfig) -> Result<Router, reqwest::Error> {
    let state = GatewayState::new(config)?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let router = Router::new()
        .route("/api/*path", any(proxy::forward_api))
        .route("/health", get(proxy::forward_health))
        .with_state(state)
        .fallback_service(assets::spa_service(&config.static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    Ok(router)
}
