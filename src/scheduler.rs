//! Tick scheduling, kept apart from what a tick does.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Produces monotonic tick timestamps in milliseconds.
pub trait Scheduler {
    /// Wait until the next tick is due. `None` once cancelled.
    fn next_tick(&mut self) -> Option<u64>;

    /// Stop producing ticks. Pending waits return `None`.
    fn cancel(&mut self);
}

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Fixed-interval ticks, standing in for a display refresh signal.
pub struct IntervalScheduler {
    origin: Instant,
    interval: Duration,
    next_due: Instant,
    token: CancelToken,
}

impl IntervalScheduler {
    pub fn new(interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            origin: now,
            interval,
            next_due: now,
            token: CancelToken::new(),
        }
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Milliseconds since the scheduler was created.
    pub fn elapsed_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

impl Scheduler for IntervalScheduler {
    fn next_tick(&mut self) -> Option<u64> {
        if self.token.is_cancelled() {
            return None;
        }

        let now = Instant::now();
        if self.next_due > now {
            thread::sleep(self.next_due - now);
        }
        if self.token.is_cancelled() {
            return None;
        }

        // A slow tick pushes the schedule back instead of bursting.
        let now = Instant::now();
        self.next_due = (self.next_due + self.interval).max(now);
        Some(self.elapsed_ms())
    }

    fn cancel(&mut self) {
        self.token.cancel();
    }
}
