//! Timer engine
//!
//! Pure state transitions over [`crate::state::Timer`] values and the clock
//! abstraction they are evaluated against. Persistence and scheduling live in
//! [`crate::store`] and [`crate::tasks`].

pub mod bulk;
pub mod clock;
pub mod transitions;

// Re-export main types
pub use bulk::{apply_to_category, BulkAction};
pub use clock::{Clock, ManualClock, Millis, SystemClock};
pub use transitions::{check_completion, derive_remaining, derive_remaining_ms, pause, reset, start};
