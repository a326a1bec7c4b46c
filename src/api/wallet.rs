use axum::{extract::State, Json};
use ethers::utils::to_checksum;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    models::ApiResponse,
    services::session::{Balances, ConnectedWallet},
};

use super::AppState;

#[derive(Deserialize)]
pub struct ConnectWalletRequest {
    pub private_key: String,
}

#[derive(Serialize)]
pub struct DisconnectResponse {
    pub disconnected: bool,
}

#[derive(Serialize)]
pub struct BalancesResponse {
    pub address: String,
    #[serde(flatten)]
    pub balances: Balances,
}

/// POST /api/v1/wallet/connect
pub async fn connect_wallet(
    State(state): State<AppState>,
    Json(req): Json<ConnectWalletRequest>,
) -> Result<Json<ApiResponse<ConnectedWallet>>> {
    let wallet = state.sessions.connect(&req.private_key).await?;
    Ok(Json(ApiResponse::success(wallet)))
}

/// POST /api/v1/wallet/disconnect
pub async fn disconnect_wallet(
    State(state): State<AppState>,
) -> Json<ApiResponse<DisconnectResponse>> {
    let disconnected = state.sessions.disconnect().await;
    Json(ApiResponse::success(DisconnectResponse { disconnected }))
}

/// GET /api/v1/wallet/balances
pub async fn get_balances(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<BalancesResponse>>> {
    let session = state.sessions.require().await?;
    let balances = session.balances(state.sessions.contracts().usdc).await?;
    Ok(Json(ApiResponse::success(BalancesResponse {
        address: to_checksum(&session.address, None),
        balances,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::services::testing::{test_private_key, MockGateway};
    use ethers::types::U256;
    use std::sync::Arc;

    #[tokio::test]
    async fn connect_then_read_balances_then_disconnect() {
        let gateway = Arc::new(MockGateway::new(35.0));
        gateway.set_balances(U256::exp10(18), U256::zero());
        let state = crate::api::test_state(gateway);

        assert!(matches!(
            get_balances(State(state.clone())).await,
            Err(AppError::NoSession)
        ));

        let Json(connected) = connect_wallet(
            State(state.clone()),
            Json(ConnectWalletRequest {
                private_key: test_private_key(),
            }),
        )
        .await
        .unwrap();
        assert!(connected.success);

        let Json(balances) = get_balances(State(state.clone())).await.unwrap();
        assert_eq!(balances.data.address, connected.data.address);
        assert_eq!(balances.data.balances.usdc, "0.000000");

        let Json(out) = disconnect_wallet(State(state.clone())).await;
        assert!(out.data.disconnected);
        let Json(again) = disconnect_wallet(State(state)).await;
        assert!(!again.data.disconnected);
    }

    #[tokio::test]
    async fn bad_key_is_rejected() {
        let state = crate::api::test_state(Arc::new(MockGateway::new(35.0)));
        let result = connect_wallet(
            State(state),
            Json(ConnectWalletRequest {
                private_key: "0xnothex".to_string(),
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }
}
