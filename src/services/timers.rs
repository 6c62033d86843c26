//! Individual timer operations
//!
//! Each operation runs one pure engine transition inside a timer-store
//! transaction and then brings the countdown tasks in line with the result.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::CompletionPolicy,
    engine::{self, Millis},
    error::{ServiceError, ServiceResult},
    state::{AppState, HistoryEntry, Timer, TimerEvent},
};

/// Input of the add-timer flow
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTimer {
    /// Caller-chosen id; a UUID v4 is generated when absent
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub category: String,
    /// Total seconds
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub duration_minutes: Option<u64>,
}

impl NewTimer {
    fn into_timer(self) -> ServiceResult<Timer> {
        let name = self.name.trim();
        let category = self.category.trim();
        if name.is_empty() {
            return Err(ServiceError::Validation("name must not be empty".to_string()));
        }
        if category.is_empty() {
            return Err(ServiceError::Validation("category must not be empty".to_string()));
        }

        let duration_secs = match (self.duration, self.duration_minutes) {
            (Some(secs), _) => secs,
            (None, Some(minutes)) => minutes.saturating_mul(60),
            (None, None) => {
                return Err(ServiceError::Validation("duration is required".to_string()));
            }
        };
        if duration_secs == 0 {
            return Err(ServiceError::Validation("duration must be positive".to_string()));
        }

        let id = match self.id {
            Some(id) if !id.trim().is_empty() => id,
            _ => Uuid::new_v4().to_string(),
        };
        Ok(Timer::new(id, name, category, duration_secs))
    }
}

pub async fn create_timer(state: &AppState, new_timer: NewTimer) -> ServiceResult<Timer> {
    let timer = new_timer.into_timer()?;

    let mut tx = state.timers.begin().await?;
    if tx.timers.iter().any(|t| t.id == timer.id) {
        return Err(ServiceError::Validation(format!("timer {} already exists", timer.id)));
    }
    tx.timers.push(timer.clone());
    tx.commit().await?;

    info!("Created timer {} ({}, {}s) in {}", timer.id, timer.name, timer.duration_secs, timer.category);
    state.record_action("create");
    state.notify(TimerEvent::Created { id: timer.id.clone() });
    Ok(timer)
}

pub async fn list_timers(state: &AppState) -> Vec<Timer> {
    state.timers.load().await
}

pub async fn get_timer(state: &AppState, id: &str) -> ServiceResult<Timer> {
    state
        .timers
        .find(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(id.to_string()))
}

/// Apply `f` to one stored timer, persist it and run `sync` on the result.
///
/// `sync` runs before the store lock is released, so countdown bookkeeping
/// for this timer happens in the same order as the stored transitions.
async fn transition<F, S>(state: &AppState, id: &str, f: F, sync: S) -> ServiceResult<Timer>
where
    F: FnOnce(&Timer, Millis) -> Timer,
    S: FnOnce(&Timer),
{
    let now = state.now();
    let mut tx = state.timers.begin().await?;
    let Some(timer) = tx.find_mut(id) else {
        return Err(ServiceError::NotFound(id.to_string()));
    };
    *timer = f(timer, now);
    let updated = timer.clone();
    tx.save().await?;
    sync(&updated);
    Ok(updated)
}

pub async fn start_timer(state: &Arc<AppState>, id: &str) -> ServiceResult<Timer> {
    let timer = transition(state, id, engine::start, |timer| {
        state.countdowns.spawn(Arc::clone(state), timer.id.clone());
    })
    .await?;
    info!("Started timer {} with {}ms left", id, timer.stored_remaining_ms());

    state.record_action("start");
    state.notify(TimerEvent::Started { id: timer.id.clone() });
    Ok(timer)
}

pub async fn pause_timer(state: &AppState, id: &str) -> ServiceResult<Timer> {
    let timer = transition(state, id, engine::pause, |timer| {
        state.countdowns.cancel(&timer.id);
    })
    .await?;
    info!("Paused timer {} at {}ms left", id, timer.stored_remaining_ms());

    state.record_action("pause");
    state.notify(TimerEvent::Paused { id: timer.id.clone() });
    Ok(timer)
}

pub async fn reset_timer(state: &AppState, id: &str) -> ServiceResult<Timer> {
    let timer = transition(
        state,
        id,
        |timer, _| engine::reset(timer),
        |timer| {
            state.countdowns.cancel(&timer.id);
        },
    )
    .await?;
    info!("Reset timer {}", id);

    state.record_action("reset");
    state.notify(TimerEvent::Reset { id: timer.id.clone() });
    Ok(timer)
}

pub async fn delete_timer(state: &AppState, id: &str) -> ServiceResult<Timer> {
    let mut tx = state.timers.begin().await?;
    let Some(index) = tx.timers.iter().position(|t| t.id == id) else {
        return Err(ServiceError::NotFound(id.to_string()));
    };
    let removed = tx.timers.remove(index);
    tx.save().await?;
    state.countdowns.cancel(id);
    drop(tx);
    info!("Deleted timer {} ({})", removed.id, removed.name);

    state.record_action("delete");
    state.notify(TimerEvent::Deleted { id: removed.id.clone() });
    Ok(removed)
}

/// Complete a running timer whose time has run out.
///
/// The completion check runs against the stored record while the collection
/// is locked, so of several concurrent callers at most one gets `Some`. The
/// history entry is appended before the timer is saved: if the append fails
/// nothing was persisted and the call can simply be repeated.
pub async fn complete_timer(state: &AppState, id: &str) -> ServiceResult<Option<HistoryEntry>> {
    let now = state.now();
    let mut tx = state.timers.begin().await?;
    let Some(index) = tx.timers.iter().position(|t| t.id == id) else {
        return Ok(None);
    };

    let (completed, fired) = engine::check_completion(&tx.timers[index], now);
    if !fired {
        return Ok(None);
    }

    let entry = HistoryEntry::completed(&completed.name, now);
    state.history.append(entry.clone()).await?;

    match state.settings.on_complete {
        CompletionPolicy::Hold => tx.timers[index] = completed,
        CompletionPolicy::Rewind => tx.timers[index] = engine::reset(&completed),
        CompletionPolicy::Remove => {
            tx.timers.remove(index);
        }
    }
    tx.commit()
        .await
        .map_err(|source| ServiceError::CompletionNotSaved {
            id: id.to_string(),
            source,
        })?;

    state.notify(TimerEvent::Completed {
        id: id.to_string(),
        entry: entry.clone(),
    });
    Ok(Some(entry))
}

/// Give every persisted running timer a countdown task.
///
/// Timers that ran out while the process was down complete on their first
/// tick, stamped with the time the expiry was detected.
pub async fn resume_countdowns(state: &Arc<AppState>) -> usize {
    let running: Vec<Timer> = state
        .timers
        .load()
        .await
        .into_iter()
        .filter(Timer::is_running)
        .collect();

    for timer in &running {
        let now = state.now();
        if engine::derive_remaining_ms(timer, now) == 0 {
            warn!("Timer {} expired while stopped, completing it", timer.id);
        }
        state.countdowns.spawn(Arc::clone(state), timer.id.clone());
    }

    info!("Resumed {} running timers", running.len());
    running.len()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        config::EngineSettings,
        engine::derive_remaining,
        services::testing::{state_with, wait_for_completion},
        state::TimerPhase,
        store::{testing::FlakyStore, MemoryStore, TIMERS_KEY},
    };

    fn plank() -> NewTimer {
        NewTimer {
            name: "Plank".to_string(),
            category: "Strength".to_string(),
            duration: Some(60),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_validates_and_generates_ids() {
        let (state, _) = state_with(Arc::new(MemoryStore::new()), EngineSettings::default());

        let timer = create_timer(&state, plank()).await.unwrap();
        assert!(Uuid::parse_str(&timer.id).is_ok());
        assert_eq!(timer.stored_remaining_ms(), 60_000);
        assert!(!timer.is_running());

        let from_minutes = NewTimer {
            duration: None,
            duration_minutes: Some(5),
            ..plank()
        };
        assert_eq!(create_timer(&state, from_minutes).await.unwrap().duration_secs, 300);

        for bad in [
            NewTimer { name: "  ".to_string(), ..plank() },
            NewTimer { category: String::new(), ..plank() },
            NewTimer { duration: Some(0), ..plank() },
            NewTimer { duration: None, ..plank() },
        ] {
            assert!(matches!(
                create_timer(&state, bad).await,
                Err(ServiceError::Validation(_))
            ));
        }
        assert_eq!(list_timers(&state).await.len(), 2);
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let (state, _) = state_with(Arc::new(MemoryStore::new()), EngineSettings::default());
        let with_id = NewTimer { id: Some("fixed".to_string()), ..plank() };
        create_timer(&state, with_id.clone()).await.unwrap();
        assert!(matches!(
            create_timer(&state, with_id).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn start_pause_reset_round_trip_through_store() {
        let (state, clock) = state_with(Arc::new(MemoryStore::new()), EngineSettings::default());
        clock.set(1_000_000);
        let id = create_timer(&state, plank()).await.unwrap().id;

        let running = start_timer(&state, &id).await.unwrap();
        assert_eq!(running.start_timestamp(), Some(1_000_000));
        assert!(state.countdowns.is_active(&id));

        clock.set(1_030_000);
        let stored = get_timer(&state, &id).await.unwrap();
        assert_eq!(derive_remaining(&stored, state.now()), 30.0);

        let paused = pause_timer(&state, &id).await.unwrap();
        assert_eq!(paused.phase, TimerPhase::Stopped { remaining_ms: 30_000 });
        assert!(!state.countdowns.is_active(&id));

        clock.advance_secs(600);
        assert_eq!(derive_remaining(&get_timer(&state, &id).await.unwrap(), state.now()), 30.0);

        let fresh = reset_timer(&state, &id).await.unwrap();
        assert_eq!(fresh.phase, TimerPhase::Stopped { remaining_ms: 60_000 });
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let (state, _) = state_with(Arc::new(MemoryStore::new()), EngineSettings::default());
        assert!(matches!(start_timer(&state, "nope").await, Err(ServiceError::NotFound(_))));
        assert!(matches!(pause_timer(&state, "nope").await, Err(ServiceError::NotFound(_))));
        assert!(matches!(delete_timer(&state, "nope").await, Err(ServiceError::NotFound(_))));
        assert_eq!(complete_timer(&state, "nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn concurrent_completions_log_exactly_once() {
        let (state, clock) = state_with(Arc::new(MemoryStore::new()), EngineSettings::default());
        let id = create_timer(&state, plank()).await.unwrap().id;
        state
            .timers
            .update(|timers| timers[0] = engine::start(&timers[0], 0))
            .await
            .unwrap();
        clock.set(61_000);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let state = Arc::clone(&state);
            let id = id.clone();
            handles.push(tokio::spawn(async move { complete_timer(&state, &id).await.unwrap() }));
        }
        let mut fired = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                fired += 1;
            }
        }

        assert_eq!(fired, 1);
        let history = state.history.load().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].name, "Plank");
        assert_eq!(history[0].completed_at, "1970-01-01T00:01:01.000Z");

        let stored = get_timer(&state, &id).await.unwrap();
        assert_eq!(stored.phase, TimerPhase::Stopped { remaining_ms: 0 });
    }

    #[tokio::test]
    async fn pause_before_expiry_prevents_completion() {
        let (state, clock) = state_with(Arc::new(MemoryStore::new()), EngineSettings::default());
        let id = create_timer(&state, plank()).await.unwrap().id;
        start_timer(&state, &id).await.unwrap();
        clock.advance_secs(59);
        pause_timer(&state, &id).await.unwrap();
        clock.advance_secs(10);

        assert_eq!(complete_timer(&state, &id).await.unwrap(), None);
        assert!(state.history.load().await.is_empty());
    }

    #[tokio::test]
    async fn history_failure_leaves_timer_running_for_retry() {
        let flaky = Arc::new(FlakyStore::default());
        let (state, clock) = state_with(flaky.clone(), EngineSettings::default());
        let id = create_timer(&state, plank()).await.unwrap().id;
        state
            .timers
            .update(|timers| timers[0] = engine::start(&timers[0], 0))
            .await
            .unwrap();
        clock.set(60_000);

        flaky.fail_writes(true);
        let err = complete_timer(&state, &id).await.unwrap_err();
        assert!(err.is_retryable());
        flaky.fail_writes(false);

        assert!(get_timer(&state, &id).await.unwrap().is_running());
        assert!(complete_timer(&state, &id).await.unwrap().is_some());
        assert_eq!(state.history.load().await.len(), 1);
    }

    #[tokio::test]
    async fn write_failure_is_surfaced_to_the_caller() {
        let flaky = Arc::new(FlakyStore::default());
        let (state, _) = state_with(flaky.clone(), EngineSettings::default());
        let id = create_timer(&state, plank()).await.unwrap().id;

        flaky.fail_writes(true);
        assert!(matches!(start_timer(&state, &id).await, Err(ServiceError::Store(_))));
        assert!(!state.countdowns.is_active(&id));
    }

    #[tokio::test]
    async fn countdown_completes_and_stops_itself() {
        let settings = EngineSettings {
            tick_interval: Duration::from_millis(10),
            ..Default::default()
        };
        let (state, clock) = state_with(Arc::new(MemoryStore::new()), settings);
        let mut events = state.subscribe();
        let id = create_timer(&state, plank()).await.unwrap().id;
        start_timer(&state, &id).await.unwrap();

        clock.advance_secs(60);
        let entry = wait_for_completion(&mut events, &id).await;
        assert_eq!(entry.name, "Plank");

        // Later ticks would have found nothing to do; the task is gone.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!state.countdowns.is_active(&id));
        assert_eq!(state.history.load().await.len(), 1);
        assert_eq!(
            get_timer(&state, &id).await.unwrap().phase,
            TimerPhase::Stopped { remaining_ms: 0 }
        );
    }

    #[tokio::test]
    async fn completion_policies() {
        for (policy, expect_remaining) in [
            (CompletionPolicy::Hold, Some(0)),
            (CompletionPolicy::Rewind, Some(60_000)),
            (CompletionPolicy::Remove, None),
        ] {
            let settings = EngineSettings {
                on_complete: policy,
                ..Default::default()
            };
            let (state, clock) = state_with(Arc::new(MemoryStore::new()), settings);
            let id = create_timer(&state, plank()).await.unwrap().id;
            state
                .timers
                .update(|timers| timers[0] = engine::start(&timers[0], 0))
                .await
                .unwrap();
            clock.set(120_000);

            assert!(complete_timer(&state, &id).await.unwrap().is_some());
            let remaining = state.timers.find(&id).await.unwrap().map(|t| t.stored_remaining_ms());
            assert_eq!(remaining, expect_remaining, "{:?}", policy);
        }
    }

    #[tokio::test]
    async fn resume_completes_timers_that_expired_offline() {
        let settings = EngineSettings {
            tick_interval: Duration::from_millis(10),
            ..Default::default()
        };
        let kv = Arc::new(MemoryStore::new());
        let (state, clock) = state_with(kv, settings);
        let mut events = state.subscribe();
        let id = create_timer(&state, plank()).await.unwrap().id;
        state
            .timers
            .update(|timers| timers[0] = engine::start(&timers[0], 0))
            .await
            .unwrap();
        clock.set(3_600_000);

        assert_eq!(resume_countdowns(&state).await, 1);
        let entry = wait_for_completion(&mut events, &id).await;
        assert_eq!(entry.completed_at, "1970-01-01T01:00:00.000Z");
    }

    #[tokio::test]
    async fn delete_cancels_countdown() {
        let (state, _) = state_with(Arc::new(MemoryStore::new()), EngineSettings::default());
        let id = create_timer(&state, plank()).await.unwrap().id;
        start_timer(&state, &id).await.unwrap();
        assert!(state.countdowns.is_active(&id));

        delete_timer(&state, &id).await.unwrap();
        assert!(!state.countdowns.is_active(&id));
        assert!(list_timers(&state).await.is_empty());
    }

    #[tokio::test]
    async fn completion_logged_but_not_saved_is_not_retried() {
        let flaky = Arc::new(FlakyStore::default());
        let (state, clock) = state_with(flaky.clone(), EngineSettings::default());
        let id = create_timer(&state, plank()).await.unwrap().id;
        state
            .timers
            .update(|timers| timers[0] = engine::start(&timers[0], 0))
            .await
            .unwrap();
        clock.set(60_000);

        flaky.fail_writes_to(Some(TIMERS_KEY));
        let err = complete_timer(&state, &id).await.unwrap_err();
        assert!(matches!(err, ServiceError::CompletionNotSaved { .. }), "{:?}", err);
        assert!(!err.is_retryable());

        assert_eq!(state.history.load().await.len(), 1);
        assert!(get_timer(&state, &id).await.unwrap().is_running());
    }

    #[tokio::test]
    async fn countdown_stops_after_unsaved_completion() {
        let flaky = Arc::new(FlakyStore::default());
        let settings = EngineSettings {
            tick_interval: Duration::from_millis(10),
            ..Default::default()
        };
        let (state, clock) = state_with(flaky.clone(), settings);
        let id = create_timer(&state, plank()).await.unwrap().id;
        state
            .timers
            .update(|timers| timers[0] = engine::start(&timers[0], 0))
            .await
            .unwrap();
        clock.set(60_000);

        flaky.fail_writes_to(Some(TIMERS_KEY));
        resume_countdowns(&state).await;
        for _ in 0..500 {
            if !state.countdowns.is_active(&id) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!state.countdowns.is_active(&id));

        // Further ticks would have logged it again.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(state.history.load().await.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_pause_and_start_keep_countdown_in_step() {
        let (state, _) = state_with(Arc::new(MemoryStore::new()), EngineSettings::default());
        let id = create_timer(&state, plank()).await.unwrap().id;

        for _ in 0..300 {
            start_timer(&state, &id).await.unwrap();

            let pause = {
                let state = Arc::clone(&state);
                let id = id.clone();
                tokio::spawn(async move { pause_timer(&state, &id).await })
            };
            let start = {
                let state = Arc::clone(&state);
                let id = id.clone();
                tokio::spawn(async move { start_timer(&state, &id).await })
            };
            pause.await.unwrap().unwrap();
            start.await.unwrap().unwrap();

            let running = get_timer(&state, &id).await.unwrap().is_running();
            assert_eq!(state.countdowns.is_active(&id), running);
        }
    }
}
