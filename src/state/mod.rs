//! State management module
//!
//! This module contains the timer and history records plus the shared
//! application state that ties stores, clock and countdown tasks together.

pub mod app_state;
pub mod events;
pub mod history;
pub mod timer;

// Re-export main types
pub use app_state::AppState;
pub use events::TimerEvent;
pub use history::HistoryEntry;
pub use timer::{Timer, TimerPhase, TimerRecord};
