//! Category-wide transitions

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::state::Timer;

use super::{clock::Millis, transitions};

/// Transition applied to every timer of one category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkAction {
    Start,
    Pause,
    Reset,
}

impl BulkAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkAction::Start => "start",
            BulkAction::Pause => "pause",
            BulkAction::Reset => "reset",
        }
    }

    /// Apply the matching single-timer transition
    pub fn apply(&self, timer: &Timer, now: Millis) -> Timer {
        match self {
            BulkAction::Start => transitions::start(timer, now),
            BulkAction::Pause => transitions::pause(timer, now),
            BulkAction::Reset => transitions::reset(timer),
        }
    }
}

impl fmt::Display for BulkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BulkAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(BulkAction::Start),
            "pause" => Ok(BulkAction::Pause),
            "reset" => Ok(BulkAction::Reset),
            other => Err(format!("unknown bulk action: {}", other)),
        }
    }
}

/// Apply `action` in place to every timer in `category`.
///
/// All affected timers see the same `now`, so a bulk start gives them one
/// shared start instant. Timers of other categories are left untouched.
/// Returns the ids of the timers in the category.
pub fn apply_to_category(
    timers: &mut [Timer],
    category: &str,
    action: BulkAction,
    now: Millis,
) -> Vec<String> {
    let mut touched = Vec::new();
    for timer in timers.iter_mut().filter(|t| t.category == category) {
        *timer = action.apply(timer, now);
        touched.push(timer.id.clone());
    }
    touched
}
