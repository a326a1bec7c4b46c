use axum::{extract::State, Json};
use serde::Serialize;

use super::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub chain_id: u64,
    pub wallet_connected: bool,
    pub pending_watches: usize,
    pub activity_records: usize,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let wallet_connected = state.sessions.connected_address().await.is_some();
    let pending_watches = state.sessions.monitor().pending().await.len();
    let activity_records = state.sessions.activity().len().await;

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        chain_id: state.config.chain_id,
        wallet_connected,
        pending_watches,
        activity_records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{test_private_key, MockGateway};
    use std::sync::Arc;

    #[tokio::test]
    async fn reports_session_state() {
        let state = crate::api::test_state(Arc::new(MockGateway::new(35.0)));
        let Json(before) = health_check(State(state.clone())).await;
        assert!(!before.wallet_connected);

        state.sessions.connect(&test_private_key()).await.unwrap();
        let Json(after) = health_check(State(state)).await;
        assert!(after.wallet_connected);
        assert_eq!(after.chain_id, 43113);
        assert_eq!(after.pending_watches, 0);
        assert_eq!(after.activity_records, 0);
    }
}
