//! Environment-driven configuration for the gateway and the chat client

use std::path::PathBuf;
use std::time::Duration;

/// Backend origin used when `API_TARGET` is not set
pub const DEFAULT_API_TARGET: &str = "http://34.175.222.176:7863";

/// Gateway origin the client talks to when no direct target is configured
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:3000";

pub const DEFAULT_PORT: u16 = 3000;

/// Upper bound for a single chat message round-trip
pub const SEND_TIMEOUT: Duration = Duration::from_secs(600);

/// The gateway keeps upstream connections open a little longer than the
/// client's own send budget so the client's deadline always fires first.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(610);

pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_USER_ID: &str = "web-user";

/// Proxy gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    /// Backend origin, without trailing slash
    pub api_target: String,
    /// Directory holding the built single-page application
    pub static_dir: PathBuf,
    pub upstream_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            api_target: DEFAULT_API_TARGET.to_string(),
            static_dir: PathBuf::from("dist"),
            upstream_timeout: UPSTREAM_TIMEOUT,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            api_target: std::env::var("API_TARGET")
                .ok()
                .filter(|t| !t.trim().is_empty())
                .map_or(defaults.api_target, |t| trim_origin(&t)),
            static_dir: std::env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            upstream_timeout: defaults.upstream_timeout,
        }
    }
}

/// Where the client sends its requests.
///
/// Chosen once from configuration; the client never switches per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiTarget {
    /// Development: talk to the backend directly
    Direct(String),
    /// Deployed: go through the proxy gateway, which forwards `/api/*`
    Gateway(String),
}

impl ApiTarget {
    pub fn base_url(&self) -> &str {
        match self {
            ApiTarget::Direct(url) | ApiTarget::Gateway(url) => url,
        }
    }

    /// Human readable description for diagnostics
    pub fn describe(&self) -> String {
        match self {
            ApiTarget::Direct(url) => url.clone(),
            ApiTarget::Gateway(url) => format!("{url} (using proxy)"),
        }
    }
}

/// Chat client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub target: ApiTarget,
    pub send_timeout: Duration,
    pub health_timeout: Duration,
    pub user_id: String,
    /// Link reported to the backend when submitting a market
    pub link: String,
}

impl ClientConfig {
    pub fn new(target: ApiTarget) -> Self {
        let link = target.base_url().to_string();
        Self {
            target,
            send_timeout: SEND_TIMEOUT,
            health_timeout: HEALTH_TIMEOUT,
            user_id: DEFAULT_USER_ID.to_string(),
            link,
        }
    }

    pub fn from_env() -> Self {
        let target = match std::env::var("MARKET_API_URL") {
            Ok(url) if !url.trim().is_empty() => ApiTarget::Direct(trim_origin(&url)),
            _ => ApiTarget::Gateway(
                std::env::var("MARKET_GATEWAY_URL")
                    .ok()
                    .filter(|u| !u.trim().is_empty())
                    .map_or_else(|| DEFAULT_GATEWAY_URL.to_string(), |u| trim_origin(&u)),
            ),
        };

        let mut config = Self::new(target);
        if let Some(secs) = std::env::var("MARKET_SEND_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            config.send_timeout = Duration::from_secs(secs);
        }
        if let Ok(user_id) = std::env::var("MARKET_USER_ID") {
            config.user_id = user_id;
        }
        if let Ok(link) = std::env::var("MARKET_LINK") {
            config.link = link;
        }
        config
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }
}

fn trim_origin(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
