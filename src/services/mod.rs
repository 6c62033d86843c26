//! Timer and history operations
//!
//! This module maps every user action (create, start, pause, reset, delete,
//! bulk actions, clear history) onto an engine transition plus a store write.

pub mod bulk;
pub mod history;
pub mod timers;

// Re-export main functions
pub use bulk::apply_bulk;
pub use history::{clear_history, list_history};
pub use timers::{
    complete_timer, create_timer, delete_timer, get_timer, list_timers, pause_timer, reset_timer,
    resume_countdowns, start_timer, NewTimer,
};
