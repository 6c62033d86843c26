//! Timer record and its persisted shape

use serde::{Deserialize, Serialize};

use crate::engine::clock::Millis;

/// Where a timer is in its countdown.
///
/// A stopped timer stores its remaining time directly. A running timer stores
/// the remaining time at the moment it was started plus the start instant;
/// its live remaining time is always derived (see [`crate::engine::derive_remaining_ms`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Stopped {
        remaining_ms: u64,
    },
    Running {
        remaining_at_start_ms: u64,
        started_at: Millis,
    },
}

/// A named countdown with a fixed duration and a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TimerRecord", into = "TimerRecord")]
pub struct Timer {
    pub id: String,
    pub name: String,
    /// Grouping label, not part of identity
    pub category: String,
    /// Total seconds, immutable after creation
    pub duration_secs: u64,
    pub phase: TimerPhase,
}

impl Timer {
    /// Create a stopped timer with its full duration remaining
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        duration_secs: u64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            duration_secs,
            phase: TimerPhase::Stopped {
                remaining_ms: duration_secs.saturating_mul(1000),
            },
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_secs.saturating_mul(1000)
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, TimerPhase::Running { .. })
    }

    /// Remaining time as of the last persisted state change
    pub fn stored_remaining_ms(&self) -> u64 {
        match self.phase {
            TimerPhase::Stopped { remaining_ms } => remaining_ms,
            TimerPhase::Running {
                remaining_at_start_ms,
                ..
            } => remaining_at_start_ms,
        }
    }

    pub fn start_timestamp(&self) -> Option<Millis> {
        match self.phase {
            TimerPhase::Running { started_at, .. } => Some(started_at),
            TimerPhase::Stopped { .. } => None,
        }
    }
}

/// Flat JSON shape of a timer as kept under the `timers` key
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerRecord {
    pub id: String,
    pub name: String,
    pub category: String,
    pub duration: u64,
    /// Seconds, possibly fractional after a mid-second pause
    pub remaining_time: f64,
    pub is_running: bool,
    #[serde(default)]
    pub start_timestamp: Option<Millis>,
}

impl TryFrom<TimerRecord> for Timer {
    type Error = String;

    fn try_from(record: TimerRecord) -> Result<Self, Self::Error> {
        if record.duration == 0 {
            return Err(format!("timer {} has a zero duration", record.id));
        }
        let duration_ms = record.duration.saturating_mul(1000);
        let remaining_ms = if record.remaining_time.is_finite() && record.remaining_time > 0.0 {
            ((record.remaining_time * 1000.0).round() as u64).min(duration_ms)
        } else {
            0
        };

        // Older records could be flagged running without a start instant; they never
        // actually counted down, so they load as stopped.
        let phase = match (record.is_running, record.start_timestamp) {
            (true, Some(started_at)) => TimerPhase::Running {
                remaining_at_start_ms: remaining_ms,
                started_at,
            },
            _ => TimerPhase::Stopped { remaining_ms },
        };

        Ok(Self {
            id: record.id,
            name: record.name,
            category: record.category,
            duration_secs: record.duration,
            phase,
        })
    }
}

impl From<Timer> for TimerRecord {
    fn from(timer: Timer) -> Self {
        Self {
            remaining_time: timer.stored_remaining_ms() as f64 / 1000.0,
            is_running: timer.is_running(),
            start_timestamp: timer.start_timestamp(),
            id: timer.id,
            name: timer.name,
            category: timer.category,
            duration: timer.duration_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_timer_is_stopped_at_full_duration() {
        let timer = Timer::new("t1", "Plank", "Strength", 90);
        assert!(!timer.is_running());
        assert_eq!(timer.stored_remaining_ms(), 90_000);
        assert_eq!(timer.start_timestamp(), None);
    }

    #[test]
    fn running_timer_serializes_with_start_timestamp() {
        let mut timer = Timer::new("t1", "Run", "Cardio", 60);
        timer.phase = TimerPhase::Running {
            remaining_at_start_ms: 45_500,
            started_at: 1_000,
        };

        let value = serde_json::to_value(&timer).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "t1",
                "name": "Run",
                "category": "Cardio",
                "duration": 60,
                "remainingTime": 45.5,
                "isRunning": true,
                "startTimestamp": 1000,
            })
        );
    }

    #[test]
    fn running_flag_without_timestamp_loads_as_stopped() {
        let timer: Timer = serde_json::from_value(json!({
            "id": "legacy",
            "name": "Stretch",
            "category": "Mobility",
            "duration": 120,
            "remainingTime": 80,
            "isRunning": true,
        }))
        .unwrap();

        assert_eq!(timer.phase, TimerPhase::Stopped { remaining_ms: 80_000 });
    }

    #[test]
    fn remaining_time_is_clamped_to_duration() {
        let timer: Timer = serde_json::from_value(json!({
            "id": "x",
            "name": "Odd",
            "category": "Misc",
            "duration": 10,
            "remainingTime": 99,
            "isRunning": false,
            "startTimestamp": null,
        }))
        .unwrap();
        assert_eq!(timer.stored_remaining_ms(), 10_000);
    }

    #[test]
    fn zero_duration_is_rejected() {
        let result: Result<Timer, _> = serde_json::from_value(json!({
            "id": "z",
            "name": "Nothing",
            "category": "Misc",
            "duration": 0,
            "remainingTime": 0,
            "isRunning": false,
        }));
        assert!(result.is_err());
    }
}
