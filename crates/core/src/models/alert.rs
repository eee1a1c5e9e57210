use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of alerts shown by the recent-alerts view.
pub const RECENT_ALERTS: usize = 10;

/// Informational message describing a ledger change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl Alert {
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
        }
    }
}
