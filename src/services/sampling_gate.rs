use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Decides when a full set of buffers may be evaluated.
///
/// A pass starts only if the buffers are full, at least `min_interval_ms`
/// passed since the previous pass *start*, and no pass is in flight.
/// Missed opportunities are dropped, never queued.
#[derive(Debug)]
pub struct SamplingGate {
    min_interval_ms: i64,
    last_pass_start_ms: Option<i64>,
    in_flight: Arc<AtomicBool>,
}

impl SamplingGate {
    pub fn new(min_interval_ms: i64) -> Self {
        Self {
            min_interval_ms: min_interval_ms.max(0),
            last_pass_start_ms: None,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Claims the in-flight slot when all three conditions hold. The
    /// returned guard releases the slot when dropped.
    pub fn try_begin(&mut self, buffers_full: bool, now_ms: i64) -> Option<PassGuard> {
        if !buffers_full {
            return None;
        }
        if let Some(last) = self.last_pass_start_ms {
            if now_ms - last < self.min_interval_ms {
                return None;
            }
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }

        self.last_pass_start_ms = Some(now_ms);
        Some(PassGuard {
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn last_pass_start_ms(&self) -> Option<i64> {
        self.last_pass_start_ms
    }
}

/// Holds the in-flight slot for the lifetime of one inference pass.
#[derive(Debug)]
pub struct PassGuard {
    in_flight: Arc<AtomicBool>,
}

impl Drop for PassGuard {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}
