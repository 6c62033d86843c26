//! Wall-clock sources for the timer engine

use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

/// Epoch milliseconds.
pub type Millis = i64;

/// Supplies the current wall-clock time so tests can inject fixed or advancing time
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now_millis(&self) -> Millis;
}

/// Real clock backed by `chrono::Utc::now()`
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> Millis {
        Utc::now().timestamp_millis()
    }
}

/// Manually driven clock. Clones share the same instant.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start: Millis) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(start)),
        }
    }

    pub fn set(&self, millis: Millis) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    pub fn advance_millis(&self, delta: i64) {
        self.millis.fetch_add(delta, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance_millis(secs * 1000);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> Millis {
        self.millis.load(Ordering::SeqCst)
    }
}

/// Format epoch milliseconds as an RFC 3339 / ISO-8601 UTC string
pub fn to_iso8601(millis: Millis) -> String {
    let at: DateTime<Utc> = Utc
        .timestamp_millis_opt(millis)
        .single()
        .unwrap_or_default();
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
