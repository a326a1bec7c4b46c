use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    constants::{BRIAN_NETWORK, BRIAN_SLIPPAGE, SWAP_GAS_LIMIT},
    error::{AppError, Result},
};

const KNOWLEDGE_KEYWORDS: [&str; 4] = ["check", "show", "get", "balance"];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct BrianRequest<'a> {
    prompt: &'a str,
    input: &'a str,
    address: &'a str,
    chain_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    network: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<BrianParameters<'a>>,
}

#[derive(Debug, Clone, Serialize)]
struct BrianParameters<'a> {
    slippage: &'static str,
    receiver: &'a str,
    testnet: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStep {
    #[serde(default)]
    to: String,
    data: Option<String>,
    value: Option<String>,
    gas_limit: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransaction {
    description: Option<String>,
    from_token: Option<Value>,
    to_token: Option<Value>,
    from_amount: Option<String>,
    to_amount: Option<String>,
    #[serde(default)]
    steps: Vec<RawStep>,
    protocol: Option<Value>,
}

/// One signed-by-the-caller step of a suggested transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStep {
    pub to: String,
    pub data: String,
    pub value: String,
    pub gas_limit: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedTransaction {
    pub description: String,
    pub steps: Vec<TransactionStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_token: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_token: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssistResponse {
    Knowledge {
        message: String,
    },
    Transactions {
        #[serde(rename = "type")]
        transaction_type: String,
        transactions: Vec<SuggestedTransaction>,
    },
    /// Upstream replied without a `result`; passed through untouched.
    Raw {
        payload: Value,
    },
}

pub fn is_knowledge_prompt(prompt: &str) -> bool {
    let lower = prompt.to_lowercase();
    KNOWLEDGE_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

pub fn transaction_type(prompt: &str) -> &'static str {
    let lower = prompt.to_lowercase();
    if lower.contains("swap") {
        "swap"
    } else if lower.contains("bridge") {
        "bridge"
    } else {
        "transfer"
    }
}

fn knowledge_message(payload: &Value) -> String {
    let result = payload.get("result").unwrap_or(&Value::Null);
    match result.get("answer").unwrap_or(result) {
        Value::String(answer) => answer.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn normalize_step(step: RawStep) -> TransactionStep {
    TransactionStep {
        to: step.to,
        data: step.data.filter(|d| !d.is_empty()).unwrap_or_else(|| "0x".to_string()),
        value: step.value.filter(|v| !v.is_empty()).unwrap_or_else(|| "0".to_string()),
        gas_limit: step
            .gas_limit
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| SWAP_GAS_LIMIT.to_string()),
    }
}

/// Accepts a single transaction or a list; a transaction without steps gets one empty step.
fn normalize_transactions(result: Value, transaction_type: &str) -> Result<Vec<SuggestedTransaction>> {
    let raw: Vec<RawTransaction> = match result {
        Value::Array(_) => serde_json::from_value(result),
        other => serde_json::from_value(other).map(|tx| vec![tx]),
    }
    .map_err(|e| AppError::ExternalAPI(format!("Unexpected transaction payload: {}", e)))?;

    Ok(raw
        .into_iter()
        .map(|tx| {
            let steps = if tx.steps.is_empty() {
                vec![normalize_step(RawStep::default())]
            } else {
                tx.steps.into_iter().map(normalize_step).collect()
            };
            SuggestedTransaction {
                description: tx
                    .description
                    .unwrap_or_else(|| format!("{} transaction", transaction_type)),
                steps,
                from_token: tx.from_token,
                to_token: tx.to_token,
                from_amount: tx.from_amount,
                to_amount: tx.to_amount,
                protocol: tx.protocol,
            }
        })
        .collect())
}

// Error statuses may carry any body; a success must carry JSON.
fn decode_payload(path: &str, status: StatusCode, body: &[u8]) -> Result<Value> {
    if !status.is_success() {
        let payload = serde_json::from_slice(body).unwrap_or(Value::Null);
        tracing::warn!("Brian API {} responded with {}: {}", path, status, payload);
        return Err(upstream_error(status, &payload));
    }
    serde_json::from_slice(body).map_err(|e| {
        AppError::ExternalAPI(format!("Malformed response from {}: {}", path, e))
    })
}

fn upstream_error(status: StatusCode, body: &Value) -> AppError {
    let detail = body
        .pointer("/error/message")
        .or_else(|| body.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("Failed to process request")
        .to_string();
    match status {
        StatusCode::BAD_REQUEST => AppError::InvalidInput(format!("Invalid request format: {}", detail)),
        StatusCode::UNAUTHORIZED => AppError::ExternalAPI("Invalid API key".to_string()),
        StatusCode::TOO_MANY_REQUESTS => AppError::RateLimitExceeded,
        _ => AppError::ExternalAPI(format!("{} ({})", detail, status)),
    }
}

/// Client for the natural-language transaction API.
#[derive(Clone, Debug)]
pub struct BrianClient {
    base_url: String,
    api_key: String,
    chain_id: u64,
    client: Client,
}

impl BrianClient {
    pub fn new(base_url: String, api_key: String, chain_id: u64) -> Self {
        Self {
            base_url,
            api_key,
            chain_id,
            client: Client::new(),
        }
    }

    async fn post(&self, path: &str, body: &BrianRequest<'_>) -> Result<Value> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let response = self
            .client
            .post(url)
            .header("x-brian-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::ExternalAPI(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::ExternalAPI(e.to_string()))?;
        decode_payload(path, status, &body)
    }

    /// Routes the prompt to the knowledge or transaction endpoint.
    pub async fn assist(&self, prompt: &str, sender_address: &str) -> Result<AssistResponse> {
        let chain_id = self.chain_id.to_string();

        if is_knowledge_prompt(prompt) {
            let request = BrianRequest {
                prompt,
                input: prompt,
                address: sender_address,
                chain_id,
                network: None,
                parameters: None,
            };
            tracing::debug!("Sending knowledge request");
            let payload = self.post("agent/knowledge", &request).await?;
            return Ok(AssistResponse::Knowledge {
                message: knowledge_message(&payload),
            });
        }

        let transaction_type = transaction_type(prompt);
        let request = BrianRequest {
            prompt,
            input: prompt,
            address: sender_address,
            chain_id,
            network: Some(BRIAN_NETWORK),
            parameters: Some(BrianParameters {
                slippage: BRIAN_SLIPPAGE,
                receiver: sender_address,
                testnet: true,
            }),
        };
        tracing::debug!("Sending {} transaction request", transaction_type);
        let mut payload = self.post("agent/transaction", &request).await?;

        match payload.get_mut("result").map(Value::take) {
            Some(result) if !result.is_null() => Ok(AssistResponse::Transactions {
                transaction_type: transaction_type.to_string(),
                transactions: normalize_transactions(result, transaction_type)?,
            }),
            _ => Ok(AssistResponse::Raw { payload }),
        }
    }
}
