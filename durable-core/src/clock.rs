//! Time source and delay primitive.
//!
//! `delay` is the only suspension point the engine introduces itself; every
//! other suspension is store I/O. Both capabilities are injectable so tests
//! can drive time deterministically.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::time::Duration;

/// Absolute time plus a cancellable delay.
#[async_trait]
pub trait Clock: Send + Sync {
    /// The current absolute time.
    fn now(&self) -> DateTime<Utc>;

    /// Suspend the caller for `duration`, then return.
    async fn delay(&self, duration: Duration);
}

/// Production clock: wall time and `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn delay(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Deterministic clock for tests.
///
/// `delay` advances the clock by the full duration and yields once, so a
/// sleeping task observes time passing without any wall-clock wait. Tests
/// that model a crashed worker can move time forward explicitly with
/// [`advance`](ManualClock::advance).
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward by `duration` without suspending.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().expect("clock lock poisoned");
        *now = *now + duration;
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock poisoned")
    }

    async fn delay(&self, duration: Duration) {
        self.advance(duration);
        tokio::task::yield_now().await;
    }
}
