//! Per-timer countdown background tasks

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, error, info, trace, warn};

use crate::{engine::derive_remaining_ms, services::complete_timer, state::AppState};

struct Countdown {
    generation: u64,
    cancel: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Registry {
    next_generation: u64,
    active: HashMap<String, Countdown>,
}

/// Owns the single countdown task of each running timer
#[derive(Default)]
pub struct CountdownRegistry {
    inner: Mutex<Registry>,
}

impl CountdownRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start polling `timer_id`, replacing any countdown it already has
    pub fn spawn(&self, state: Arc<AppState>, timer_id: String) {
        let Ok(mut registry) = self.inner.lock() else {
            error!("Countdown registry lock poisoned, not tracking {}", timer_id);
            return;
        };

        registry.next_generation += 1;
        let generation = registry.next_generation;
        let (cancel, cancel_rx) = oneshot::channel();
        let handle = tokio::spawn(countdown_task(
            state,
            timer_id.clone(),
            generation,
            cancel_rx,
        ));

        if let Some(previous) = registry.active.insert(
            timer_id.clone(),
            Countdown {
                generation,
                cancel,
                handle,
            },
        ) {
            debug!("Replacing countdown for timer {}", timer_id);
            let _ = previous.cancel.send(());
        }
    }

    /// Stop the countdown of `timer_id`; no further ticks run after this returns
    pub fn cancel(&self, timer_id: &str) -> bool {
        let Ok(mut registry) = self.inner.lock() else {
            return false;
        };
        match registry.active.remove(timer_id) {
            Some(countdown) => {
                debug!("Cancelling countdown for timer {}", timer_id);
                let _ = countdown.cancel.send(());
                true
            }
            None => false,
        }
    }

    /// Stop every countdown and return their handles so callers can await them
    pub fn cancel_all(&self) -> Vec<JoinHandle<()>> {
        let Ok(mut registry) = self.inner.lock() else {
            return Vec::new();
        };
        registry
            .active
            .drain()
            .map(|(_, countdown)| {
                let _ = countdown.cancel.send(());
                countdown.handle
            })
            .collect()
    }

    pub fn is_active(&self, timer_id: &str) -> bool {
        self.inner
            .lock()
            .map(|registry| registry.active.contains_key(timer_id))
            .unwrap_or(false)
    }

    pub fn active_count(&self) -> usize {
        self.inner
            .lock()
            .map(|registry| registry.active.len())
            .unwrap_or(0)
    }

    /// Unregister a countdown that ended by itself, unless it was already replaced
    fn finish(&self, timer_id: &str, generation: u64) {
        if let Ok(mut registry) = self.inner.lock() {
            if registry
                .active
                .get(timer_id)
                .is_some_and(|c| c.generation == generation)
            {
                registry.active.remove(timer_id);
            }
        }
    }
}

enum Tick {
    Continue,
    Done,
}

/// Poll one timer until it completes, stops running, disappears or is cancelled
async fn countdown_task(
    state: Arc<AppState>,
    timer_id: String,
    generation: u64,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    debug!("Countdown started for timer {}", timer_id);

    let mut ticker = interval(state.settings.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            // Fires on cancel and when the registry dropped our sender
            _ = &mut cancel_rx => {
                debug!("Countdown for timer {} cancelled", timer_id);
                break;
            }

            _ = ticker.tick() => {
                if let Tick::Done = tick(&state, &timer_id).await {
                    break;
                }
            }
        }
    }

    state.countdowns.finish(&timer_id, generation);
}

async fn tick(state: &AppState, timer_id: &str) -> Tick {
    let timer = match state.timers.find(timer_id).await {
        Ok(Some(timer)) => timer,
        Ok(None) => {
            debug!("Timer {} no longer exists, stopping countdown", timer_id);
            return Tick::Done;
        }
        Err(e) => {
            warn!("Failed to read timer {}: {}", timer_id, e);
            return Tick::Continue;
        }
    };

    if !timer.is_running() {
        return Tick::Done;
    }

    let remaining_ms = derive_remaining_ms(&timer, state.now());
    if remaining_ms > 0 {
        trace!("Timer {} has {}ms left", timer_id, remaining_ms);
        return Tick::Continue;
    }

    match complete_timer(state, timer_id).await {
        Ok(Some(entry)) => {
            info!("Timer {} ({}) completed at {}", timer_id, entry.name, entry.completed_at);
            Tick::Done
        }
        Ok(None) => Tick::Done,
        Err(e) if e.is_retryable() => {
            error!("Failed to complete timer {}, retrying next tick: {}", timer_id, e);
            Tick::Continue
        }
        Err(e) => {
            error!("Failed to persist completion of timer {}: {}", timer_id, e);
            Tick::Done
        }
    }
}
