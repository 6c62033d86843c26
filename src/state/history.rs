//! Completion history records

use serde::{Deserialize, Serialize};

use crate::engine::clock::{to_iso8601, Millis};

/// One completed countdown. Append-only, identified only by list position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Copy of the timer's name when it completed
    pub name: String,
    /// ISO-8601 instant the completion was detected
    pub completed_at: String,
}

impl HistoryEntry {
    pub fn completed(name: impl Into<String>, at: Millis) -> Self {
        Self {
            name: name.into(),
            completed_at: to_iso8601(at),
        }
    }
}
