// src/api/mod.rs

pub mod activity;
pub mod health;
pub mod prompt;
pub mod transactions;
pub mod wallet;
pub mod watches;

use axum::http::HeaderMap;
use std::sync::Arc;

use crate::config::Config;
use crate::integrations::BrianClient;
use crate::services::{RateLimiter, SessionManager};

// AppState definition
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: Arc<SessionManager>,
    pub rate_limiter: RateLimiter,
    pub brian: Option<BrianClient>,
}

impl AppState {
    pub fn new(config: Config, sessions: Arc<SessionManager>) -> Self {
        let rate_limiter =
            RateLimiter::new(config.prompt_rate_limit, config.prompt_rate_window_secs);
        let brian = config.brian_api_key.clone().map(|key| {
            BrianClient::new(config.brian_api_url.clone(), key, config.chain_id)
        });
        Self {
            config,
            sessions,
            rate_limiter,
            brian,
        }
    }
}

/// Caller identity for rate limiting: client IP from proxy headers, else `anonymous`.
pub fn caller_token(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or(real_ip)
        .map(str::to_string)
        .unwrap_or_else(|| "anonymous".to_string())
}

#[cfg(test)]
pub(crate) fn test_state(
    gateway: Arc<crate::services::testing::MockGateway>,
) -> AppState {
    let config = crate::config::test_config();
    AppState::new(
        config,
        Arc::new(crate::services::session::test_manager(gateway)),
    )
}
