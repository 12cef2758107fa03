//! Timestamp-derived identifiers.
//!
//! Orders, reviews and notifications are identified by the current
//! millisecond. Two calls inside the same millisecond would collide, so the
//! source hands out strictly increasing values: when the wall clock has not
//! advanced past the last value issued, the last value plus one is returned.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// Source of wall-clock milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// The system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
    }
}

/// Strictly increasing millisecond values within one process.
#[derive(Debug, Default)]
pub struct MonotonicMillis<C = SystemClock> {
    clock: C,
    last: AtomicU64,
}

impl MonotonicMillis<SystemClock> {
    /// Create a source backed by the system clock.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<C: Clock> MonotonicMillis<C> {
    /// Create a source backed by `clock`.
    pub const fn with_clock(clock: C) -> Self {
        Self {
            clock,
            last: AtomicU64::new(0),
        }
    }

    /// Next value: the clock reading, or one past the last value issued.
    pub fn next(&self) -> u64 {
        let now = self.clock.now_millis();
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, candidate, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(observed) => last = observed,
            }
        }
    }
}

/// Order identifier: `DR-` followed by the last six digits of `millis`.
#[must_use]
pub fn order_id_from_millis(millis: u64) -> String {
    format!("DR-{:06}", millis % 1_000_000)
}

/// Review identifier: `r` followed by `millis`.
#[must_use]
pub fn review_id_from_millis(millis: u64) -> String {
    format!("r{millis}")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FrozenClock(u64);

    impl Clock for FrozenClock {
        fn now_millis(&self) -> u64 {
            self.0
        }
    }

    #[test]
    fn test_same_millisecond_never_repeats() {
        let ids = MonotonicMillis::with_clock(FrozenClock(1_700_000_123_456));
        let a = ids.next();
        let b = ids.next();
        let c = ids.next();
        assert_eq!(a, 1_700_000_123_456);
        assert_eq!(b, a + 1);
        assert_eq!(c, a + 2);
    }

    #[test]
    fn test_system_clock_is_increasing() {
        let ids = MonotonicMillis::new();
        let a = ids.next();
        let b = ids.next();
        assert!(b > a);
    }

    #[test]
    fn test_order_id_format() {
        assert_eq!(order_id_from_millis(1_700_000_123_456), "DR-123456");
        assert_eq!(order_id_from_millis(1_700_000_000_042), "DR-000042");
    }

    #[test]
    fn test_review_id_format() {
        assert_eq!(review_id_from_millis(1_700_000_123_456), "r1700000123456");
    }
}
