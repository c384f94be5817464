//! Retry policy with exponential backoff for reconciliation errors.
//!
//! Errors are classified as transient or permanent; transient errors back
//! off exponentially, permanent errors wait for the resource to change.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use kube::runtime::controller::Action;
use tracing::{debug, warn};

/// Give up retrying after this many consecutive failures.
const MAX_RETRIES: u32 = 10;

/// Base delay for exponential backoff (seconds).
const BASE_DELAY_SECS: u64 = 5;

/// Ceiling on the backoff delay (1 hour).
const MAX_DELAY_SECS: u64 = 3600;

/// Tracks retry attempts per resource UID.
///
/// Uses `std::sync::Mutex` because the `error_policy` callback is
/// synchronous; an async mutex there would need `block_on()`, which can
/// deadlock the runtime.
#[derive(Debug, Default)]
pub struct RetryTracker {
    attempts: Mutex<HashMap<String, u32>>,
}

impl RetryTracker {
    /// Create a new retry tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for a resource and return the new attempt count.
    pub fn increment(&self, uid: &str) -> u32 {
        let mut attempts = self.attempts.lock().expect("retry tracker mutex poisoned");
        let count = attempts.entry(uid.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Clear the attempt count after a successful reconciliation.
    pub fn reset(&self, uid: &str) {
        let mut attempts = self.attempts.lock().expect("retry tracker mutex poisoned");
        attempts.remove(uid);
    }

    /// Current attempt count for a resource.
    pub fn get(&self, uid: &str) -> u32 {
        let attempts = self.attempts.lock().expect("retry tracker mutex poisoned");
        attempts.get(uid).copied().unwrap_or(0)
    }
}

/// Error classification for retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Retried with backoff: conflicts, rate limits, server unavailability.
    Transient,
    /// Not retried: the resource must change before another attempt helps.
    Permanent,
}

/// Compute the requeue action for a failed pass.
pub fn compute_backoff(attempt: u32, kind: ErrorKind) -> Action {
    match kind {
        ErrorKind::Transient => {
            if attempt >= MAX_RETRIES {
                warn!(
                    attempt,
                    max_retries = MAX_RETRIES,
                    "Max retries exceeded, waiting for resource change"
                );
                Action::await_change()
            } else {
                // 5s, 10s, 20s, 40s, ... capped at 1 hour.
                let delay_secs = BASE_DELAY_SECS * 2u64.pow(attempt.saturating_sub(1));
                let capped = delay_secs.min(MAX_DELAY_SECS);
                debug!(attempt, delay_secs = capped, "Scheduling retry with backoff");
                Action::requeue(Duration::from_secs(capped))
            }
        }
        ErrorKind::Permanent => {
            warn!("Permanent error, waiting for resource change");
            Action::await_change()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_counts_and_resets() {
        let tracker = RetryTracker::new();

        assert_eq!(tracker.get("uid-1"), 0);
        assert_eq!(tracker.increment("uid-1"), 1);
        assert_eq!(tracker.increment("uid-1"), 2);

        tracker.reset("uid-1");
        assert_eq!(tracker.get("uid-1"), 0);
    }

    #[test]
    fn tracker_is_per_resource() {
        let tracker = RetryTracker::new();
        tracker.increment("uid-1");
        assert_eq!(tracker.get("uid-2"), 0);
    }

    #[test]
    fn transient_errors_requeue_with_backoff() {
        // Action's duration is only visible through Debug formatting.
        let action = compute_backoff(1, ErrorKind::Transient);
        assert!(format!("{action:?}").contains("Some"));

        let action = compute_backoff(5, ErrorKind::Transient);
        assert!(format!("{action:?}").contains("Some"));
    }

    #[test]
    fn transient_errors_stop_after_max_retries() {
        let action = compute_backoff(MAX_RETRIES, ErrorKind::Transient);
        assert!(format!("{action:?}").contains("None"));
    }

    #[test]
    fn permanent_errors_await_change() {
        let action = compute_backoff(1, ErrorKind::Permanent);
        assert!(format!("{action:?}").contains("None"));
    }
}
