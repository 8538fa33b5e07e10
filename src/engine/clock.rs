use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Wall-clock source for record timestamps. Simulation time is counted in
/// ticks and never reads this.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock: starts at a fixed instant and moves forward by
/// `step` on every read.
#[derive(Debug)]
pub struct FixedClock {
    start: DateTime<Utc>,
    step: Duration,
    reads: AtomicI64,
}

impl FixedClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self::stepping(start, Duration::zero())
    }

    pub fn stepping(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            start,
            step,
            reads: AtomicI64::new(0),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        let n = self.reads.fetch_add(1, Ordering::Relaxed);
        let n = i32::try_from(n).unwrap_or(i32::MAX);
        let offset = self.step.checked_mul(n).unwrap_or(if self.step < Duration::zero() {
            Duration::MIN
        } else {
            Duration::MAX
        });
        self.start
            .checked_add_signed(offset)
            .unwrap_or(if offset < Duration::zero() {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            })
    }
}
