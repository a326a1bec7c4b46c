use serde::{Deserialize, Serialize};

/// Raw row returned by the etherscan-compatible explorer API (`txlist` / `tokentx`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerTx {
    #[serde(default)]
    pub time_stamp: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    // tokentx rows omit this field
    #[serde(default)]
    pub is_error: String,
    #[serde(default)]
    pub gas_used: String,
    #[serde(default)]
    pub hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryKind {
    Transfer,
    Swap,
    #[serde(rename = "Token Transfer")]
    TokenTransfer,
}

impl HistoryKind {
    pub fn label(&self) -> &'static str {
        match self {
            HistoryKind::Transfer => "Transfer",
            HistoryKind::Swap => "Swap",
            HistoryKind::TokenTransfer => "Token Transfer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: u64,
    pub kind: HistoryKind,
    pub token: String,
    /// Base units as reported by the explorer.
    pub value: String,
    pub from: String,
    pub to: Option<String>,
    pub success: bool,
    pub gas_used: String,
    pub hash: String,
}
