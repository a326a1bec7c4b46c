use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::ActivityRecord;

/// In-memory, append-only activity log. Oldest record first.
#[derive(Debug, Clone, Default)]
pub struct ActivityLog {
    records: Arc<RwLock<Vec<ActivityRecord>>>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append(&self, record: ActivityRecord) {
        tracing::debug!("Activity: {}", record.description);
        self.records.write().await.push(record);
    }

    pub async fn all(&self) -> Vec<ActivityRecord> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityKind;

    #[tokio::test]
    async fn keeps_append_order() {
        let log = ActivityLog::new();
        log.append(ActivityRecord::info("first", "a")).await;
        log.append(ActivityRecord::success(ActivityKind::Swap, "second", "0x1")).await;
        log.append(ActivityRecord::failure(ActivityKind::Transfer, "third", "boom")).await;

        let records = log.all().await;
        let descriptions: Vec<_> = records.iter().map(|r| r.description.as_str()).collect();
        assert_eq!(descriptions, vec!["first", "second", "third"]);
        assert_eq!(log.len().await, 3);
    }

    #[tokio::test]
    async fn clones_share_the_same_log() {
        let log = ActivityLog::new();
        let other = log.clone();
        other.append(ActivityRecord::info("shared", "x")).await;
        assert_eq!(log.len().await, 1);
    }
}
