//! Main application state management

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::debug;

use super::TimerEvent;
use crate::{
    config::EngineSettings,
    engine::{Clock, Millis},
    store::{HistoryStore, KeyValueStore, TimerStore},
    tasks::CountdownRegistry,
};

/// Shared state behind every handler and countdown task
pub struct AppState {
    /// Persisted timers, written only through `TimerStore::update`/`begin`
    pub timers: TimerStore,
    /// Persisted completion history
    pub history: HistoryStore,
    pub clock: Arc<dyn Clock>,
    pub settings: EngineSettings,
    /// One countdown task per running timer
    pub countdowns: CountdownRegistry,
    /// Server metadata
    pub start_time: Instant,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
    /// Channel for timer change notifications
    pub event_tx: broadcast::Sender<TimerEvent>,
}

impl AppState {
    /// Create state over one key-value store holding both collections
    pub fn new(kv: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, settings: EngineSettings) -> Self {
        let (event_tx, _) = broadcast::channel(256);

        Self {
            timers: TimerStore::new(Arc::clone(&kv)),
            history: HistoryStore::new(kv),
            clock,
            settings,
            countdowns: CountdownRegistry::new(),
            start_time: Instant::now(),
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
            event_tx,
        }
    }

    /// Current wall-clock instant in epoch milliseconds
    pub fn now(&self) -> Millis {
        self.clock.now_millis()
    }

    /// Subscribe to timer change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.event_tx.subscribe()
    }

    pub fn notify(&self, event: TimerEvent) {
        // No subscribers is the normal case outside tests.
        if self.event_tx.send(event).is_err() {
            debug!("No listeners for timer event");
        }
    }

    /// Remember the most recent user action for the health endpoint
    pub fn record_action(&self, action: impl Into<String>) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.into());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}
