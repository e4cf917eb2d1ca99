use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

use chrono::{NaiveDateTime, TimeDelta};

/// Time source for the pipeline. `now_ms` drives throttling and cooldowns,
/// `local_now` stamps persisted records with a local wall-clock time.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
    fn local_now(&self) -> NaiveDateTime;
}

/// `now_ms` counts monotonic milliseconds since construction, so wall-clock
/// corrections cannot stall the throttle or the cooldown.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        i64::try_from(self.started.elapsed().as_millis()).unwrap_or(i64::MAX)
    }

    fn local_now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Hand-driven clock: `now_ms` starts at zero and `local_now` is `origin + now_ms`.
#[derive(Debug)]
pub struct ManualClock {
    origin: NaiveDateTime,
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(origin: NaiveDateTime) -> Self {
        Self {
            origin,
            now_ms: AtomicI64::new(0),
        }
    }

    pub fn set_ms(&self, ms: i64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: i64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn local_now(&self) -> NaiveDateTime {
        self.origin + TimeDelta::milliseconds(self.now_ms())
    }
}
