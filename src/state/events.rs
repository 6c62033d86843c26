//! Notifications broadcast after persisted timer changes

use serde::Serialize;

use super::HistoryEntry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum TimerEvent {
    Created { id: String },
    Started { id: String },
    Paused { id: String },
    Reset { id: String },
    Completed { id: String, entry: HistoryEntry },
    Deleted { id: String },
    HistoryCleared,
}
