use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Wallet not connected")]
    NoSession,

    #[error("RPC connectivity error: {0}")]
    Connectivity(String),

    #[error("Price oracle error: {0}")]
    Oracle(String),

    #[error("Transaction submission failed: {0}")]
    Submission(String),

    #[error("Transaction confirmation timed out: {0}")]
    ConfirmationTimeout(String),

    #[error("Failed to fetch transaction history: {0}")]
    HistoryFetch(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("External API error: {0}")]
    ExternalAPI(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    /// HTTP status and stable machine code reported to the front end.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            AppError::NoSession => (StatusCode::CONFLICT, "WALLET_NOT_CONNECTED"),
            AppError::Connectivity(_) => (StatusCode::BAD_GATEWAY, "RPC_UNAVAILABLE"),
            AppError::Oracle(_) => (StatusCode::BAD_GATEWAY, "ORACLE_ERROR"),
            AppError::Submission(_) => (StatusCode::BAD_GATEWAY, "SUBMISSION_FAILED"),
            AppError::ConfirmationTimeout(_) => {
                (StatusCode::GATEWAY_TIMEOUT, "CONFIRMATION_TIMEOUT")
            }
            AppError::HistoryFetch(_) => (StatusCode::BAD_GATEWAY, "HISTORY_FETCH_FAILED"),
            AppError::RateLimitExceeded => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::ExternalAPI(_) => (StatusCode::BAD_GATEWAY, "EXTERNAL_API_ERROR"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match self {
            AppError::NoSession => "Please connect your wallet first".to_string(),
            AppError::RateLimitExceeded => {
                "Too many requests. Please try again later.".to_string()
            }
            AppError::InvalidInput(ref msg) | AppError::NotFound(ref msg) => msg.clone(),
            _ => self.to_string(),
        };

        let body = Json(ErrorResponse {
            success: false,
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
