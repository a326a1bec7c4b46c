use axum::{extract::State, Json};
use serde::Serialize;

use crate::{
    models::{ActivityRecord, ApiResponse},
    utils::explorer_tx_url,
};

use super::AppState;

/// Activity record plus a display link when it carries a hash.
#[derive(Serialize)]
pub struct ActivityEntry {
    #[serde(flatten)]
    pub record: ActivityRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
}

/// GET /api/v1/activity
///
/// Oldest first.
pub async fn get_activity(State(state): State<AppState>) -> Json<ApiResponse<Vec<ActivityEntry>>> {
    let base = state.config.block_explorer_url.as_str();
    let entries = state
        .sessions
        .activity()
        .all()
        .await
        .into_iter()
        .map(|record| ActivityEntry {
            explorer_url: record.hash.as_deref().map(|hash| explorer_tx_url(base, hash)),
            record,
        })
        .collect();
    Json(ApiResponse::success(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityKind;
    use crate::services::testing::MockGateway;
    use std::sync::Arc;

    #[tokio::test]
    async fn links_only_records_with_hashes() {
        let state = crate::api::test_state(Arc::new(MockGateway::new(35.0)));
        let log = state.sessions.activity();
        log.append(ActivityRecord::info("Balance Query", "Current Balances:")).await;
        log.append(ActivityRecord::success(ActivityKind::Swap, "Swap 1 AVAX for USDC", "0xabc")).await;

        let Json(response) = get_activity(State(state)).await;
        assert!(response.data[0].explorer_url.is_none());
        assert_eq!(
            response.data[1].explorer_url.as_deref(),
            Some("https://testnet.snowtrace.io/tx/0xabc")
        );
    }
}
