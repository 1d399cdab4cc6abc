//! Shared write-rate limiter.
//!
//! Token bucket over a sliding one-second window. One limiter is
//! shared by every concurrent entity operation of a run; each write
//! consumes a slot before going out, so the effective write rate never
//! exceeds the remote-enforced threshold even with hundreds of
//! entities in flight.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Async-safe sliding-window rate limiter.
pub struct RateLimiter {
    threshold: usize,
    window: Duration,
    stamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Limiter allowing `threshold` consumptions per second.
    ///
    /// A threshold of zero is clamped to one; a limiter that never
    /// grants a slot would deadlock every write.
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        Self::with_window(threshold, Duration::from_secs(1))
    }

    /// Limiter with an explicit window length.
    #[must_use]
    pub fn with_window(threshold: usize, window: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            window,
            stamps: Mutex::new(VecDeque::new()),
        }
    }

    /// The configured per-window threshold.
    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Consumes one slot, waiting until the window has room.
    pub async fn acquire(&self) {
        loop {
            let wait_until = {
                let mut stamps = self.stamps.lock().await;
                let now = Instant::now();
                Self::prune(&mut stamps, now, self.window);

                if stamps.len() < self.threshold {
                    stamps.push_back(now);
                    return;
                }
                // Window full: the earliest stamp leaving it frees a slot.
                *stamps.front().expect("window full implies stamps") + self.window
            };
            sleep_until(wait_until).await;
        }
    }

    /// Consumes a slot only if one is free right now.
    pub async fn try_consume(&self) -> bool {
        let mut stamps = self.stamps.lock().await;
        let now = Instant::now();
        Self::prune(&mut stamps, now, self.window);

        if stamps.len() < self.threshold {
            stamps.push_back(now);
            true
        } else {
            false
        }
    }

    fn prune(stamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(front) = stamps.front() {
            if now.duration_since(*front) >= window {
                stamps.pop_front();
            } else {
                break;
            }
        }
    }
}
