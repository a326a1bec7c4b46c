// src/models/mod.rs
pub mod activity;
pub mod history;

use serde::Serialize;

// Re-export commonly used types so other modules can use `crate::models::X`
pub use activity::{ActivityKind, ActivityRecord, ActivityStatus};
pub use history::{ExplorerTx, HistoryEntry, HistoryKind};

// ==================== API RESPONSE ====================
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
