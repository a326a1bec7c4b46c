use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Info,
    Transfer,
    Swap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Success,
    Failure,
}

/// One completed action and its outcome. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub kind: ActivityKind,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ActivityStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActivityRecord {
    /// Read-only query result (balances, history).
    pub fn info(description: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            kind: ActivityKind::Info,
            description: description.into(),
            timestamp: Utc::now(),
            hash: None,
            result: Some(result.into()),
            status: None,
            error: None,
        }
    }

    pub fn success(kind: ActivityKind, description: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            timestamp: Utc::now(),
            hash: Some(hash.into()),
            result: None,
            status: Some(ActivityStatus::Success),
            error: None,
        }
    }

    pub fn failure(kind: ActivityKind, description: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            timestamp: Utc::now(),
            hash: None,
            result: None,
            status: Some(ActivityStatus::Failure),
            error: Some(error.into()),
        }
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_lowercase_tags_and_skips_empty_fields() {
        let record = ActivityRecord::success(ActivityKind::Swap, "Swap 1 AVAX for USDC", "0xabc");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["kind"], "swap");
        assert_eq!(value["status"], "success");
        assert_eq!(value["hash"], "0xabc");
        assert!(value.get("error").is_none());
        assert!(value.get("result").is_none());
    }

    #[test]
    fn failure_carries_error_text() {
        let record = ActivityRecord::failure(ActivityKind::Transfer, "Transfer", "nonce too low");
        assert_eq!(record.status, Some(ActivityStatus::Failure));
        assert_eq!(record.error.as_deref(), Some("nonce too low"));
        assert!(record.hash.is_none());
    }
}
