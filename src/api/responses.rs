//! API response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    engine::{derive_remaining_ms, BulkAction, Millis},
    state::{Timer, TimerRecord},
};

/// A timer as displayed at one polling instant.
///
/// Carries the persisted fields plus the live values derived for `now`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    #[serde(flatten)]
    pub timer: TimerRecord,
    /// Live remaining seconds
    pub remaining_seconds: f64,
    pub elapsed_seconds: f64,
    /// Fraction of the duration already elapsed, 0.0 to 1.0
    pub progress: f64,
}

impl TimerView {
    pub fn observe(timer: &Timer, now: Millis) -> Self {
        let remaining_ms = derive_remaining_ms(timer, now);
        let duration_ms = timer.duration_ms();
        let elapsed_ms = duration_ms.saturating_sub(remaining_ms);
        let progress = if duration_ms == 0 {
            0.0
        } else {
            elapsed_ms as f64 / duration_ms as f64
        };

        Self {
            timer: TimerRecord::from(timer.clone()),
            remaining_seconds: remaining_ms as f64 / 1000.0,
            elapsed_seconds: elapsed_ms as f64 / 1000.0,
            progress,
        }
    }
}

/// Timers sharing one category label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub category: String,
    pub timers: Vec<TimerView>,
}

/// Group timers by category in first-seen order
pub fn group_by_category(timers: &[Timer], now: Millis) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();
    for timer in timers {
        let view = TimerView::observe(timer, now);
        match groups.iter_mut().find(|g| g.category == timer.category) {
            Some(group) => group.timers.push(view),
            None => groups.push(CategoryGroup {
                category: timer.category.clone(),
                timers: vec![view],
            }),
        }
    }
    groups
}

/// Result of a category-wide action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkResponse {
    pub category: String,
    pub action: BulkAction,
    pub timers: Vec<TimerView>,
}

/// API response structure for actions without a payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ApiResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Error body returned with every non-2xx status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: error.into(),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime: String,
    pub active_countdowns: usize,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}
