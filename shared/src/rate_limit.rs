//! Rolling-window rate limiter shared by every provider call in the process

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Allows at most `max_calls` acquisitions within any trailing `window`.
///
/// Callers that would exceed the ceiling wait until the oldest recorded call
/// leaves the window. Waiting is never an error.
#[derive(Debug)]
pub struct RollingWindowLimiter {
    max_calls: usize,
    window: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl RollingWindowLimiter {
    pub fn new(max_calls: u32, window: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1) as usize,
            window,
            calls: Mutex::new(VecDeque::new()),
        }
    }

    /// Limiter with a per-minute ceiling
    pub fn per_minute(max_calls: u32) -> Self {
        Self::new(max_calls, Duration::from_secs(60))
    }

    /// Wait for budget and record one call. Returns how long the caller waited.
    pub async fn acquire(&self) -> Duration {
        let started = Instant::now();
        loop {
            let wait = {
                let mut calls = self.calls.lock().await;
                let now = Instant::now();
                while calls
                    .front()
                    .is_some_and(|oldest| now.duration_since(*oldest) >= self.window)
                {
                    calls.pop_front();
                }

                if calls.len() < self.max_calls {
                    calls.push_back(now);
                    return now.duration_since(started);
                }

                calls
                    .front()
                    .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
                    .unwrap_or_default()
            };

            // Lock is released while sleeping so other callers can queue up
            debug!(
                "Rate limit reached ({} calls per {:?}), waiting {:?}",
                self.max_calls, self.window, wait
            );
            sleep(wait).await;
        }
    }

    /// Calls still inside the trailing window
    pub async fn recent_calls(&self) -> usize {
        let calls = self.calls.lock().await;
        let now = Instant::now();
        calls
            .iter()
            .filter(|at| now.duration_since(**at) < self.window)
            .count()
    }
}
