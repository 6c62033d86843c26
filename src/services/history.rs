//! Completion history access

use tracing::info;

use crate::{
    error::ServiceResult,
    state::{AppState, HistoryEntry, TimerEvent},
};

pub async fn list_history(state: &AppState) -> Vec<HistoryEntry> {
    state.history.load().await
}

/// Remove every history entry. Timers are not affected.
pub async fn clear_history(state: &AppState) -> ServiceResult<()> {
    state.history.clear().await?;
    info!("History cleared");
    state.record_action("clear-history");
    state.notify(TimerEvent::HistoryCleared);
    Ok(())
}
