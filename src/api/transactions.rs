use axum::{
    extract::{Path, Query, State},
    Json,
};
use ethers::types::H256;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{
    constants::HISTORY_LIMIT,
    error::{AppError, Result},
    models::{ApiResponse, HistoryEntry},
    utils::explorer_tx_url,
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct ReceiptResponse {
    pub hash: String,
    pub block_number: Option<u64>,
    pub from: String,
    pub to: Option<String>,
    pub gas_used: Option<String>,
    pub success: bool,
    pub explorer_url: String,
}

/// GET /api/v1/transactions/history
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<HistoryEntry>>>> {
    let session = state.sessions.require().await?;
    let limit = query.limit.unwrap_or(HISTORY_LIMIT).clamp(1, HISTORY_LIMIT);
    let history = session
        .gateway
        .transaction_history(session.address, limit)
        .await?;
    Ok(Json(ApiResponse::success(history)))
}

/// GET /api/v1/transactions/{tx_hash}
pub async fn get_details(
    State(state): State<AppState>,
    Path(tx_hash): Path<String>,
) -> Result<Json<ApiResponse<ReceiptResponse>>> {
    let session = state.sessions.require().await?;
    let hash = H256::from_str(tx_hash.trim())
        .map_err(|_| AppError::InvalidInput(format!("Invalid transaction hash {}", tx_hash)))?;

    let receipt = session
        .gateway
        .transaction_receipt(hash)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Transaction {} not found", tx_hash)))?;

    let hash = format!("{:#x}", receipt.transaction_hash);
    Ok(Json(ApiResponse::success(ReceiptResponse {
        explorer_url: explorer_tx_url(&state.config.block_explorer_url, &hash),
        hash,
        block_number: receipt.block_number.map(|n| n.as_u64()),
        from: format!("{:#x}", receipt.from),
        to: receipt.to.map(|to| format!("{:#x}", to)),
        gas_used: receipt.gas_used.map(|gas| gas.to_string()),
        success: receipt.status.map(|s| s.as_u64() == 1).unwrap_or(false),
    })))
}
