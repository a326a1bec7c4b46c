use axum::http::HeaderValue;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod constants;
mod error;
mod integrations;
mod models;
mod services;
mod utils;

use config::Config;
use constants::API_VERSION;
use services::{EvmConnector, SessionManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "avax_prompt_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;
    let contracts = config.contracts()?;

    tracing::info!("Starting AVAX prompt backend");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("API Version: {}", API_VERSION);
    tracing::info!(
        "Chain id {} ({})",
        config.chain_id,
        if config.is_testnet() { "testnet" } else { "mainnet" }
    );

    let connector = Arc::new(EvmConnector::new(config.clone(), contracts));
    let sessions = Arc::new(SessionManager::new(config.clone(), contracts, connector));
    let app_state = api::AppState::new(config.clone(), sessions.clone());

    // Build router
    let app = build_router(app_state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Revoke the session so no watch timer acts after shutdown
    sessions.disconnect().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn build_router(state: api::AppState) -> Router {
    // CORS configuration
    let cors = cors_from_config(&state.config);

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Wallet session
        .route("/api/v1/wallet/connect", post(api::wallet::connect_wallet))
        .route(
            "/api/v1/wallet/disconnect",
            post(api::wallet::disconnect_wallet),
        )
        .route("/api/v1/wallet/balances", get(api::wallet::get_balances))
        // Prompts
        .route("/api/v1/prompt/execute", post(api::prompt::execute_prompt))
        .route("/api/v1/prompt/assist", post(api::prompt::assist_prompt))
        // Conditional swaps
        .route("/api/v1/watches", get(api::watches::list_watches))
        .route("/api/v1/watches/{id}", delete(api::watches::cancel_watch))
        // Activity
        .route("/api/v1/activity", get(api::activity::get_activity))
        // Transactions
        .route(
            "/api/v1/transactions/history",
            get(api::transactions::get_history),
        )
        .route(
            "/api/v1/transactions/{tx_hash}",
            get(api::transactions::get_details),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_from_config(config: &Config) -> CorsLayer {
    let raw = config.cors_allowed_origins.trim();
    if raw.is_empty() || raw == "*" {
        return CorsLayer::very_permissive();
    }

    let allowed: Vec<HeaderValue> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if allowed.is_empty() {
        tracing::warn!("No valid CORS origins parsed; falling back to permissive");
        return CorsLayer::very_permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
