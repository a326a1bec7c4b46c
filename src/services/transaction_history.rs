use chrono::{TimeZone, Utc};
use ethers::{
    types::{Address, U256},
    utils::{format_ether, format_units, to_checksum},
};
use serde::Deserialize;

use crate::{
    constants::{HISTORY_END_BLOCK, USDC_DECIMALS},
    error::{AppError, Result},
    models::{ExplorerTx, HistoryEntry, HistoryKind},
};

const HISTORY_SEPARATOR: &str = "\n-------------------\n";

#[derive(Debug, Deserialize)]
struct ExplorerEnvelope {
    #[serde(default)]
    result: serde_json::Value,
}

// A non-array `result` is how the explorer reports "no transactions found".
fn rows_from_envelope(envelope: ExplorerEnvelope) -> Result<Vec<ExplorerTx>> {
    match envelope.result {
        serde_json::Value::Array(_) => serde_json::from_value(envelope.result)
            .map_err(|e| AppError::HistoryFetch(format!("malformed explorer rows: {}", e))),
        _ => Ok(Vec::new()),
    }
}

fn addresses_equal(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

fn parse_timestamp(raw: &str) -> u64 {
    raw.trim().parse::<u64>().unwrap_or(0)
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Tags, merges and orders native and token transfers, newest first.
///
/// A native transfer is a `Swap` when it was sent to the router. The sort is
/// stable, so rows sharing a timestamp keep native-before-token order.
pub fn merge_history(
    native: Vec<ExplorerTx>,
    token: Vec<ExplorerTx>,
    router: Address,
    limit: usize,
) -> Vec<HistoryEntry> {
    let router = to_checksum(&router, None);
    let native = native.into_iter().map(|tx| {
        let kind = if addresses_equal(&tx.to, &router) {
            HistoryKind::Swap
        } else {
            HistoryKind::Transfer
        };
        (tx, kind, "AVAX")
    });
    let token = token
        .into_iter()
        .map(|tx| (tx, HistoryKind::TokenTransfer, "USDC"));

    let mut merged: Vec<HistoryEntry> = native
        .chain(token)
        .map(|(tx, kind, symbol)| HistoryEntry {
            timestamp: parse_timestamp(&tx.time_stamp),
            kind,
            token: symbol.to_string(),
            value: tx.value,
            from: tx.from,
            to: non_empty(&tx.to),
            success: tx.is_error.is_empty() || tx.is_error == "0",
            gas_used: tx.gas_used,
            hash: tx.hash,
        })
        .collect();

    merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    merged.truncate(limit);
    merged
}

fn format_amount(entry: &HistoryEntry) -> String {
    let raw = U256::from_dec_str(entry.value.trim()).unwrap_or_default();
    if entry.token == "AVAX" {
        format!("{} AVAX", format_ether(raw))
    } else {
        let formatted = format_units(raw, USDC_DECIMALS).unwrap_or_else(|_| entry.value.clone());
        format!("{} {}", formatted, entry.token)
    }
}

/// Human-readable rendering stored as the activity record result.
pub fn render_history(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "No recent transactions found".to_string();
    }

    entries
        .iter()
        .map(|entry| {
            let timestamp = Utc
                .timestamp_opt(entry.timestamp as i64, 0)
                .single()
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| entry.timestamp.to_string());
            format!(
                "{}\nType: {}\nAmount: {}\nFrom: {}\nTo: {}\nStatus: {}\nGas Used: {}\nHash: {}\n",
                timestamp,
                entry.kind.label(),
                format_amount(entry),
                entry.from,
                entry.to.as_deref().unwrap_or("Contract Creation"),
                if entry.success { "Success" } else { "Failed" },
                if entry.gas_used.is_empty() { "0" } else { entry.gas_used.as_str() },
                entry.hash,
            )
        })
        .collect::<Vec<_>>()
        .join(HISTORY_SEPARATOR)
}

/// Client for the etherscan-compatible explorer API.
#[derive(Debug, Clone)]
pub struct ExplorerClient {
    http: reqwest::Client,
    api_url: String,
}

impl ExplorerClient {
    pub fn new(api_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url,
        }
    }

    fn list_url(&self, params: &[(&str, String)]) -> Result<url::Url> {
        url::Url::parse_with_params(&self.api_url, params)
            .map_err(|e| AppError::HistoryFetch(format!("invalid explorer URL: {}", e)))
    }

    async fn fetch_rows(&self, url: url::Url) -> Result<Vec<ExplorerTx>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::HistoryFetch(e.to_string()))?;
        if !response.status().is_success() {
            return Err(AppError::HistoryFetch(format!(
                "explorer responded with {}",
                response.status()
            )));
        }
        let envelope = response
            .json::<ExplorerEnvelope>()
            .await
            .map_err(|e| AppError::HistoryFetch(e.to_string()))?;
        rows_from_envelope(envelope)
    }

    /// Fetches native and USDC transfers concurrently; either failing fails the whole call.
    pub async fn fetch_history(
        &self,
        address: Address,
        usdc: Address,
        router: Address,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>> {
        let address = to_checksum(&address, None);
        let offset = limit.to_string();
        let native_url = self.list_url(&[
            ("module", "account".to_string()),
            ("action", "txlist".to_string()),
            ("address", address.clone()),
            ("startblock", "0".to_string()),
            ("endblock", HISTORY_END_BLOCK.to_string()),
            ("page", "1".to_string()),
            ("offset", offset.clone()),
            ("sort", "desc".to_string()),
        ])?;
        let token_url = self.list_url(&[
            ("module", "account".to_string()),
            ("action", "tokentx".to_string()),
            ("address", address),
            ("contractaddress", to_checksum(&usdc, None)),
            ("startblock", "0".to_string()),
            ("endblock", HISTORY_END_BLOCK.to_string()),
            ("page", "1".to_string()),
            ("offset", offset),
            ("sort", "desc".to_string()),
        ])?;

        let (native, token) = futures_util::future::try_join(
            self.fetch_rows(native_url),
            self.fetch_rows(token_url),
        )
        .await
        .inspect_err(|e| tracing::warn!("Transaction history fetch failed: {}", e))?;

        tracing::debug!(
            "Explorer returned {} native and {} token rows",
            native.len(),
            token.len()
        );
        Ok(merge_history(native, token, router, limit))
    }
}
