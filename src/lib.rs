//! Countdown Keeper - persistent countdown timers grouped by category
//!
//! This library provides the timer state machine, the stores that persist
//! timers and their completion history, the per-timer countdown tasks and an
//! HTTP API exposing every user action.

pub mod config;
pub mod engine;
pub mod error;
pub mod state;
pub mod store;
pub mod services;
pub mod tasks;
pub mod api;
pub mod utils;

// Re-export commonly used types
pub use config::{CompletionPolicy, Config, EngineSettings};
pub use error::{ServiceError, StoreError};
pub use state::{AppState, HistoryEntry, Timer, TimerPhase};
pub use api::create_router;
pub use utils::signals::shutdown_signal;
