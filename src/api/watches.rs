use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::{
    error::{AppError, Result},
    models::ApiResponse,
    services::conditional_swap::PendingWatch,
};

use super::AppState;

#[derive(Serialize)]
pub struct CancelWatchResponse {
    pub id: u64,
    pub cancelled: bool,
}

/// GET /api/v1/watches
pub async fn list_watches(State(state): State<AppState>) -> Json<ApiResponse<Vec<PendingWatch>>> {
    Json(ApiResponse::success(state.sessions.monitor().pending().await))
}

/// DELETE /api/v1/watches/{id}
pub async fn cancel_watch(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ApiResponse<CancelWatchResponse>>> {
    if !state.sessions.monitor().cancel(id).await {
        return Err(AppError::NotFound(format!("Watch {} not found", id)));
    }
    Ok(Json(ApiResponse::success(CancelWatchResponse {
        id,
        cancelled: true,
    })))
}
