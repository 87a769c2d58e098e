//! In-memory limiting of failed sign-in attempts.
//!
//! DESIGN
//! ======
//! Sliding-window counters backed by `HashMap<String, VecDeque<Instant>>`,
//! keyed by normalized email. Only failures are recorded; a successful
//! sign-in clears the key. A key whose window has fully expired is dropped,
//! either when it is next checked or on the next recorded failure.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::config::SignInLimitConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("too many failed sign-in attempts (max {limit}/{window_secs}s), retry in {retry_after_secs}s")]
pub struct RateLimited {
    pub limit: usize,
    pub window_secs: u64,
    pub retry_after_secs: u64,
}

#[derive(Clone)]
pub struct SignInLimiter {
    failures: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
    config: SignInLimitConfig,
}

impl SignInLimiter {
    #[must_use]
    pub fn new(config: SignInLimitConfig) -> Self {
        Self { failures: Arc::new(Mutex::new(HashMap::new())), config }
    }

    /// Reject the attempt when the key already used up its failure budget.
    pub fn check(&self, key: &str) -> Result<(), RateLimited> {
        self.check_at(key, Instant::now())
    }

    pub fn record_failure(&self, key: &str) {
        self.record_failure_at(key, Instant::now());
    }

    pub fn clear(&self, key: &str) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), RateLimited> {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(deque) = failures.get_mut(key) else {
            return Ok(());
        };
        prune_window(deque, now, self.config.window);
        if deque.is_empty() {
            failures.remove(key);
            return Ok(());
        }
        if deque.len() < self.config.max_failures {
            return Ok(());
        }

        let retry_after = deque
            .front()
            .map_or(Duration::ZERO, |oldest| self.config.window.saturating_sub(now.duration_since(*oldest)));
        Err(RateLimited {
            limit: self.config.max_failures,
            window_secs: self.config.window.as_secs(),
            retry_after_secs: retry_after.as_secs().max(1),
        })
    }

    fn record_failure_at(&self, key: &str, now: Instant) {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        failures.retain(|_, deque| {
            prune_window(deque, now, self.config.window);
            !deque.is_empty()
        });
        failures.entry(key.to_owned()).or_default().push_back(now);
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn prune_window(deque: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = deque.front() {
        if now.duration_since(front) > window {
            deque.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
