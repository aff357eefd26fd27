//! Circuit state for the remote config store.
//!
//! # States
//! - Available: remote reads pass through
//! - Unavailable: remote store assumed down, cache misses fail fast
//!
//! # State Transitions
//! ```text
//! Available → Unavailable: any connectivity failure
//! Unavailable → (retry permitted): retry_interval elapsed since last failure
//! (retry permitted) → Available: the next real read succeeds
//! (retry permitted) → Unavailable: the next real read fails, cooldown restarts
//! ```
//!
//! # Design Decisions
//! - One circuit per process, shared by all readers
//! - No separate half-open probe; the next cache miss after the cooldown is the probe
//! - Fixed retry interval, no exponential growth

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::observability::metrics;

#[derive(Debug)]
struct Inner {
    available: bool,
    last_failure: Option<Instant>,
}

/// Health of the remote store as seen by this process.
#[derive(Debug)]
pub struct CircuitState {
    inner: Mutex<Inner>,
    retry_interval: Duration,
}

/// Point-in-time view of the circuit for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitSnapshot {
    pub available: bool,
    pub since_last_failure: Option<Duration>,
    pub retry_interval: Duration,
}

impl CircuitState {
    pub fn new(retry_interval: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                available: true,
                last_failure: None,
            }),
            retry_interval,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// True if the store is healthy or the cooldown since the last failure has elapsed.
    pub fn is_available(&self, now: Instant) -> bool {
        let inner = self.lock();
        if inner.available {
            return true;
        }
        match inner.last_failure {
            Some(at) => now.saturating_duration_since(at) >= self.retry_interval,
            None => true,
        }
    }

    /// Mark the store healthy after a successful call.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        if !inner.available {
            inner.available = true;
            drop(inner);
            tracing::info!("Remote config store available again");
            metrics::record_circuit_transition("available");
        }
    }

    /// Mark the store unavailable as of `now`.
    pub fn record_failure(&self, now: Instant) {
        let mut inner = self.lock();
        let was_available = inner.available;
        inner.available = false;
        inner.last_failure = Some(now);
        drop(inner);

        if was_available {
            tracing::warn!(
                retry_interval_ms = self.retry_interval.as_millis() as u64,
                "Remote config store marked unavailable"
            );
            metrics::record_circuit_transition("unavailable");
        }
    }

    pub fn snapshot(&self, now: Instant) -> CircuitSnapshot {
        let inner = self.lock();
        CircuitSnapshot {
            available: inner.available,
            since_last_failure: inner.last_failure.map(|at| now.saturating_duration_since(at)),
            retry_interval: self.retry_interval,
        }
    }

    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_available() {
        let circuit = CircuitState::new(Duration::from_secs(5));
        assert!(circuit.is_available(Instant::now()));
        assert!(circuit.snapshot(Instant::now()).since_last_failure.is_none());
    }

    #[test]
    fn test_failure_blocks_until_cooldown() {
        let circuit = CircuitState::new(Duration::from_secs(5));
        let t0 = Instant::now();
        circuit.record_failure(t0);

        assert!(!circuit.is_available(t0));
        assert!(!circuit.is_available(t0 + Duration::from_secs(4)));
        assert!(circuit.is_available(t0 + Duration::from_secs(5)));
        // Retry being permitted does not flip the flag back.
        assert!(!circuit.snapshot(t0 + Duration::from_secs(6)).available);
    }

    #[test]
    fn test_failed_retry_restarts_cooldown() {
        let circuit = CircuitState::new(Duration::from_secs(5));
        let t0 = Instant::now();
        circuit.record_failure(t0);
        let t1 = t0 + Duration::from_secs(6);
        assert!(circuit.is_available(t1));

        circuit.record_failure(t1);
        assert!(!circuit.is_available(t1 + Duration::from_secs(1)));
    }

    #[test]
    fn test_success_restores() {
        let circuit = CircuitState::new(Duration::from_secs(5));
        let t0 = Instant::now();
        circuit.record_failure(t0);
        circuit.record_success();

        assert!(circuit.is_available(t0));
        let snap = circuit.snapshot(t0 + Duration::from_secs(1));
        assert!(snap.available);
        assert_eq!(snap.since_last_failure, Some(Duration::from_secs(1)));
    }
}
