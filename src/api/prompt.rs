use axum::{extract::State, http::HeaderMap, Json};
use ethers::utils::to_checksum;
use serde::Deserialize;

use crate::{
    error::{AppError, Result},
    integrations::AssistResponse,
    models::ApiResponse,
    services::{prompt_executor::PromptOutcome, PromptExecutor},
    utils::is_valid_address,
};

use super::{caller_token, AppState};

#[derive(Debug, Deserialize)]
pub struct ExecutePromptRequest {
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct AssistRequest {
    pub prompt: String,
    pub sender_address: Option<String>,
}

/// POST /api/v1/prompt/execute
pub async fn execute_prompt(
    State(state): State<AppState>,
    Json(req): Json<ExecutePromptRequest>,
) -> Result<Json<ApiResponse<PromptOutcome>>> {
    let executor = PromptExecutor::new(state.sessions.clone());
    let outcome = executor.execute(&req.prompt).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// POST /api/v1/prompt/assist
pub async fn assist_prompt(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AssistRequest>,
) -> Result<Json<ApiResponse<AssistResponse>>> {
    let token = caller_token(&headers);
    state.rate_limiter.check(&token).await?;

    let client = state.brian.as_ref().ok_or_else(|| {
        AppError::ExternalAPI("Natural-language API is not configured".to_string())
    })?;

    let prompt = req.prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::InvalidInput("Please enter a prompt".to_string()));
    }

    let sender = match req.sender_address.as_deref().map(str::trim) {
        Some(address) if !address.is_empty() => {
            if !is_valid_address(address) {
                return Err(AppError::InvalidInput(format!("Invalid address {}", address)));
            }
            address.to_string()
        }
        _ => state
            .sessions
            .connected_address()
            .await
            .map(|address| to_checksum(&address, None))
            .ok_or(AppError::NoSession)?,
    };

    tracing::info!("Assist request from {}", token);
    let response = client.assist(prompt, &sender).await?;
    Ok(Json(ApiResponse::success(response)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{test_private_key, MockGateway};
    use std::sync::Arc;

    #[tokio::test]
    async fn execute_requires_wallet_for_actions() {
        let state = crate::api::test_state(Arc::new(MockGateway::new(35.0)));
        let result = execute_prompt(
            State(state.clone()),
            Json(ExecutePromptRequest {
                prompt: "show my balances".to_string(),
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::NoSession)));

        state.sessions.connect(&test_private_key()).await.unwrap();
        let Json(response) = execute_prompt(
            State(state),
            Json(ExecutePromptRequest {
                prompt: "show my balances".to_string(),
            }),
        )
        .await
        .unwrap();
        assert!(response.data.message.starts_with("Current Balances:"));
    }

    #[tokio::test]
    async fn assist_is_rate_limited_before_anything_else() {
        let mut state = crate::api::test_state(Arc::new(MockGateway::new(35.0)));
        state.rate_limiter = crate::services::RateLimiter::new(1, 60);
        let request = || AssistRequest {
            prompt: "swap 1 avax".to_string(),
            sender_address: None,
        };

        // unconfigured client still consumes the caller's budget
        let first = assist_prompt(State(state.clone()), HeaderMap::new(), Json(request())).await;
        assert!(matches!(first, Err(AppError::ExternalAPI(_))));
        let second = assist_prompt(State(state), HeaderMap::new(), Json(request())).await;
        assert!(matches!(second, Err(AppError::RateLimitExceeded)));
    }
}
