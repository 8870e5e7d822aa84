//! Data models for the run ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded dataset run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub dataset: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// `success` or `failed`
    pub status: String,
    /// The stage that failed
    pub stage: Option<String>,
    pub reason: Option<String>,
    pub rows: u64,
}

impl LedgerEntry {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_FAILED: &str = "failed";
