//! Timer state machine
//!
//! Every function here is pure: it takes a timer and the current instant and
//! returns the next timer. Nothing is cached between calls, so the live
//! remaining time of a running timer is always recomputed from its start
//! instant instead of being extrapolated tick by tick.
//!
//! ```text
//! Stopped --start--> Running --pause--> Stopped
//!    ^                  |
//!    +---reset----------+  (reset is valid from any phase)
//!                       |
//!                       +--check_completion (remaining == 0)--> Stopped { 0 }
//! ```
//!
//! Calls whose precondition does not hold (pausing a stopped timer, starting a
//! running one) return the timer unchanged.

use crate::state::{Timer, TimerPhase};

use super::clock::Millis;

/// Live remaining milliseconds at `now`
pub fn derive_remaining_ms(timer: &Timer, now: Millis) -> u64 {
    match timer.phase {
        TimerPhase::Stopped { remaining_ms } => remaining_ms,
        TimerPhase::Running {
            remaining_at_start_ms,
            started_at,
        } => {
            // A clock stepping backwards never adds time back.
            let elapsed = now.saturating_sub(started_at).max(0) as u64;
            remaining_at_start_ms.saturating_sub(elapsed)
        }
    }
}

/// Live remaining seconds at `now`, never below zero
pub fn derive_remaining(timer: &Timer, now: Millis) -> f64 {
    derive_remaining_ms(timer, now) as f64 / 1000.0
}

/// Begin counting down from the stored remaining time.
///
/// A timer that already ran out restarts from its full duration; starting it
/// from zero would only complete it again on the next tick.
pub fn start(timer: &Timer, now: Millis) -> Timer {
    match timer.phase {
        TimerPhase::Running { .. } => timer.clone(),
        TimerPhase::Stopped { remaining_ms } => {
            let remaining_at_start_ms = if remaining_ms == 0 {
                timer.duration_ms()
            } else {
                remaining_ms
            };
            Timer {
                phase: TimerPhase::Running {
                    remaining_at_start_ms,
                    started_at: now,
                },
                ..timer.clone()
            }
        }
    }
}

/// Freeze the countdown at its live remaining time
pub fn pause(timer: &Timer, now: Millis) -> Timer {
    if !timer.is_running() {
        return timer.clone();
    }
    Timer {
        phase: TimerPhase::Stopped {
            remaining_ms: derive_remaining_ms(timer, now),
        },
        ..timer.clone()
    }
}

pub fn reset(timer: &Timer) -> Timer {
    Timer {
        phase: TimerPhase::Stopped {
            remaining_ms: timer.duration_ms(),
        },
        ..timer.clone()
    }
}

/// Stop a running timer whose time has run out.
///
/// Returns the completed timer and `true` only for the transition itself; a
/// timer that is not running never reports completion.
pub fn check_completion(timer: &Timer, now: Millis) -> (Timer, bool) {
    if timer.is_running() && derive_remaining_ms(timer, now) == 0 {
        let completed = Timer {
            phase: TimerPhase::Stopped { remaining_ms: 0 },
            ..timer.clone()
        };
        (completed, true)
    } else {
        (timer.clone(), false)
    }
}
