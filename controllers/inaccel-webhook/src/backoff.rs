//! # Fibonacci Backoff
//!
//! Retry delays for failed VirtualMachine reconciliations. Delays grow along
//! the Fibonacci sequence in minutes: 1m, 1m, 2m, 3m, 5m, 8m, then 10m for
//! every further failure. Each object keeps its own failure count, which a
//! successful reconcile clears. Counts that have not grown for
//! [`FAILURE_RETENTION`] are forgotten, so VMs deleted while failing do not
//! linger in the table.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Shortest retry delay, in minutes
pub const MIN_BACKOFF_MINUTES: u64 = 1;
/// Longest retry delay, in minutes
pub const MAX_BACKOFF_MINUTES: u64 = 10;
/// How long a failure count survives without a new failure
pub const FAILURE_RETENTION: Duration = Duration::from_secs(60 * 60);

/// Delay before retrying after `failures` consecutive failures.
///
/// `failures` counts from 1; the first two failures both wait `min_minutes`.
#[must_use]
pub fn fibonacci_backoff(failures: u32, min_minutes: u64, max_minutes: u64) -> Duration {
    let (mut prev, mut current) = (0, min_minutes);
    for _ in 1..failures {
        let next = prev + current;
        prev = current;
        current = next.min(max_minutes);
        if current >= max_minutes {
            break;
        }
    }
    Duration::from_secs(current.min(max_minutes) * 60)
}

/// Consecutive failure counts, keyed by `namespace/name`.
#[derive(Debug)]
pub struct BackoffTracker {
    failures: Mutex<HashMap<String, Failures>>,
    retention: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Failures {
    count: u32,
    last: Instant,
}

impl Default for BackoffTracker {
    fn default() -> Self {
        Self::with_retention(FAILURE_RETENTION)
    }
}

impl BackoffTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty tracker that forgets counts idle for `retention`.
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            failures: Mutex::new(HashMap::new()),
            retention,
        }
    }

    /// Count a failure for `key` and return how long to wait before retrying.
    pub fn record_failure(&self, key: &str) -> Duration {
        let now = Instant::now();
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        failures.retain(|_, entry| now.duration_since(entry.last) < self.retention);

        let entry = failures.entry(key.to_string()).or_insert(Failures { count: 0, last: now });
        entry.count = entry.count.saturating_add(1);
        entry.last = now;
        fibonacci_backoff(entry.count, MIN_BACKOFF_MINUTES, MAX_BACKOFF_MINUTES)
    }

    /// Forget the failures of `key` after a successful reconcile.
    pub fn reset(&self, key: &str) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// Number of objects with a failure count
    #[cfg(test)]
    pub fn tracked(&self) -> usize {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
