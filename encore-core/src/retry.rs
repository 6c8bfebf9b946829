//! Bounded retry and confirm-by-polling helpers.
//!
//! Media-server requests are fire-and-forget; their effect is confirmed by
//! polling state afterwards. Both loops are bounded so the single worker can
//! never hang on an unresponsive server.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Result;

/// Retry transient failures with a fixed backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Minimum 1.
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds, fails non-transiently, or attempts run out.
    ///
    /// # Errors
    /// The last error returned by `op`.
    pub fn run<T>(&self, what: &str, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!(what, attempt, attempts, error = %e, "transient failure; retrying");
                    std::thread::sleep(self.backoff);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Poll a condition a bounded number of times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            interval: Duration::from_millis(500),
        }
    }
}

impl PollPolicy {
    /// Call `check` until it yields `Some`, sleeping `interval` between
    /// calls. Returns `None` when every attempt came back empty.
    pub fn until<T>(&self, what: &str, mut check: impl FnMut() -> Option<T>) -> Option<T> {
        for attempt in 1..=self.attempts.max(1) {
            if let Some(value) = check() {
                debug!(what, attempt, "poll condition met");
                return Some(value);
            }
            if attempt < self.attempts {
                std::thread::sleep(self.interval);
            }
        }
        debug!(what, attempts = self.attempts, "poll gave up");
        None
    }
}
