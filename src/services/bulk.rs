//! Category-wide start/pause/reset

use std::sync::Arc;

use tracing::info;

use crate::{
    engine::{self, BulkAction},
    error::ServiceResult,
    state::{AppState, Timer, TimerEvent},
};

/// Apply `action` to every timer in `category` with one persisted write.
///
/// The whole collection is read and written back inside a single store
/// transaction, so timers of other categories and concurrent edits are
/// never lost. Countdowns are spawned or cancelled before that transaction
/// ends. Returns the timers of the category after the change.
pub async fn apply_bulk(
    state: &Arc<AppState>,
    category: &str,
    action: BulkAction,
) -> ServiceResult<Vec<Timer>> {
    let now = state.now();
    let mut tx = state.timers.begin().await?;
    let touched = engine::apply_to_category(&mut tx.timers, category, action, now);
    let affected: Vec<Timer> = tx
        .timers
        .iter()
        .filter(|t| touched.contains(&t.id))
        .cloned()
        .collect();
    tx.save().await?;

    // Countdowns follow the stored state before the lock is released.
    for timer in &affected {
        match action {
            BulkAction::Start => state.countdowns.spawn(Arc::clone(state), timer.id.clone()),
            BulkAction::Pause | BulkAction::Reset => {
                state.countdowns.cancel(&timer.id);
            }
        }
    }
    drop(tx);

    info!("Applied {} to {} timers in {}", action, affected.len(), category);

    for timer in &affected {
        let id = timer.id.clone();
        state.notify(match action {
            BulkAction::Start => TimerEvent::Started { id },
            BulkAction::Pause => TimerEvent::Paused { id },
            BulkAction::Reset => TimerEvent::Reset { id },
        });
    }
    state.record_action(format!("{}-all:{}", action, category));

    Ok(affected)
}
