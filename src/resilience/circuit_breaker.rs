//! Circuit breaker for destination protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: destination assumed down, requests fail fast
//! - Half-Open: testing if destination recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= failure_threshold
//! Open → Half-Open: first can_attempt() at or after next_attempt_at
//! Half-Open → Closed: consecutive successes >= success_threshold
//! Half-Open → Open: any failure
//! ```
//!
//! # Design Decisions
//! - Per-destination circuit breaker (not global)
//! - Fail fast in Open state (no waiting for timeout)
//! - The Open → Half-Open check and transition happen under one lock, so a
//!   single caller performs it and nobody observes a half-written state
//! - Every mutation is written to the breaker store; store errors are logged
//!   and otherwise ignored

use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;
use crate::persistence::{BreakerStore, PersistedBreakerRecord};
use crate::resilience::clock::Clock;

/// The current state of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// All attempts are allowed.
    #[default]
    Closed,
    /// Attempts are rejected until the cooldown elapses.
    Open,
    /// Attempts are allowed while the destination proves itself.
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time copy of a breaker's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    /// Consecutive failures; zeroed by any success.
    pub failure_count: u32,
    /// Consecutive successes while half-open.
    pub success_count: u32,
    /// Unix time (ms) before which an open circuit rejects attempts.
    pub next_attempt_at: u64,
}

impl From<PersistedBreakerRecord> for BreakerSnapshot {
    fn from(record: PersistedBreakerRecord) -> Self {
        Self {
            state: record.state,
            failure_count: record.failure_count,
            success_count: record.success_count,
            next_attempt_at: record.next_attempt_at,
        }
    }
}

impl BreakerSnapshot {
    fn to_record(self, timestamp: u64) -> PersistedBreakerRecord {
        PersistedBreakerRecord {
            state: self.state,
            failure_count: self.failure_count,
            success_count: self.success_count,
            next_attempt_at: self.next_attempt_at,
            timestamp,
        }
    }
}

/// A circuit breaker guarding one destination.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use studio_api_client::config::CircuitBreakerConfig;
/// use studio_api_client::persistence::MemoryStore;
/// use studio_api_client::resilience::{CircuitBreaker, SystemClock};
///
/// let breaker = CircuitBreaker::new(
///     "http://localhost:5005/api",
///     "circuit-breaker:http://localhost:5005/api",
///     CircuitBreakerConfig::default(),
///     Arc::new(MemoryStore::new()),
///     Arc::new(SystemClock),
/// );
///
/// if breaker.can_attempt() {
///     // Make the request...
///     breaker.record_success();
/// }
/// ```
pub struct CircuitBreaker {
    destination: String,
    storage_key: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerSnapshot>,
    store: Arc<dyn BreakerStore>,
    clock: Arc<dyn Clock>,
}

impl CircuitBreaker {
    /// Create a breaker, adopting any snapshot the store holds for `storage_key`.
    pub fn new(
        destination: impl Into<String>,
        storage_key: impl Into<String>,
        config: CircuitBreakerConfig,
        store: Arc<dyn BreakerStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let destination = destination.into();
        let storage_key = storage_key.into();

        let initial = match store.load(&storage_key) {
            Ok(Some(record)) => {
                tracing::info!(
                    destination = %destination,
                    state = %record.state,
                    failure_count = record.failure_count,
                    written_at = record.timestamp,
                    "Rehydrated circuit breaker"
                );
                BreakerSnapshot::from(record)
            }
            Ok(None) => BreakerSnapshot::default(),
            Err(e) => {
                tracing::warn!(
                    destination = %destination,
                    error = %e,
                    "Failed to load circuit breaker state, starting closed"
                );
                BreakerSnapshot::default()
            }
        };
        metrics::record_circuit_state(&destination, initial.state);

        Self {
            destination,
            storage_key,
            config,
            inner: Mutex::new(initial),
            store,
            clock,
        }
    }

    /// Check if an attempt may be made now.
    ///
    /// When the circuit is open and the cooldown has elapsed, this moves it
    /// to half-open and grants the probing attempt in the same call.
    pub fn can_attempt(&self) -> bool {
        let mut inner = self.inner.lock().expect("circuit breaker mutex poisoned");
        let state = inner.state;

        match state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let now = self.clock.now_ms();
                if now < inner.next_attempt_at {
                    return false;
                }
                inner.state = CircuitState::HalfOpen;
                inner.success_count = 0;
                self.transitioned(CircuitState::Open, &inner);
                self.persist(&inner, now);
                true
            }
        }
    }

    /// Record a successful attempt.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker mutex poisoned");
        let now = self.clock.now_ms();

        inner.failure_count = 0;
        if inner.state == CircuitState::HalfOpen {
            inner.success_count += 1;
            if inner.success_count >= self.config.success_threshold {
                inner.state = CircuitState::Closed;
                inner.success_count = 0;
                self.transitioned(CircuitState::HalfOpen, &inner);
            }
        }
        self.persist(&inner, now);
    }

    /// Record a failed attempt.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker mutex poisoned");
        let now = self.clock.now_ms();

        inner.failure_count = inner.failure_count.saturating_add(1);
        let state = inner.state;
        match state {
            CircuitState::Closed if inner.failure_count >= self.config.failure_threshold => {
                self.trip(&mut inner, now);
                self.transitioned(CircuitState::Closed, &inner);
            }
            CircuitState::HalfOpen => {
                self.trip(&mut inner, now);
                self.transitioned(CircuitState::HalfOpen, &inner);
            }
            // Already open: keep the existing cooldown.
            _ => {}
        }
        self.persist(&inner, now);
    }

    /// Force the breaker closed with zeroed counters.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker mutex poisoned");
        let previous = inner.state;
        *inner = BreakerSnapshot::default();
        if previous != CircuitState::Closed {
            self.transitioned(previous, &inner);
        }
        self.persist(&inner, self.clock.now_ms());
    }

    /// Current state, without side effects.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().expect("circuit breaker mutex poisoned").state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        *self.inner.lock().expect("circuit breaker mutex poisoned")
    }

    pub fn failure_count(&self) -> u32 {
        self.inner.lock().expect("circuit breaker mutex poisoned").failure_count
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    fn trip(&self, inner: &mut BreakerSnapshot, now: u64) {
        inner.state = CircuitState::Open;
        inner.success_count = 0;
        inner.next_attempt_at = now.saturating_add(self.config.timeout_ms);
    }

    fn transitioned(&self, from: CircuitState, inner: &BreakerSnapshot) {
        if inner.state == CircuitState::Open {
            tracing::warn!(
                destination = %self.destination,
                from = %from,
                to = %inner.state,
                failure_count = inner.failure_count,
                retry_at = inner.next_attempt_at,
                "Circuit opened"
            );
        } else {
            tracing::info!(
                destination = %self.destination,
                from = %from,
                to = %inner.state,
                "Circuit state changed"
            );
        }
        metrics::record_circuit_state(&self.destination, inner.state);
    }

    fn persist(&self, inner: &BreakerSnapshot, now: u64) {
        if let Err(e) = self.store.save(&self.storage_key, &inner.to_record(now)) {
            tracing::warn!(
                destination = %self.destination,
                error = %e,
                "Failed to persist circuit breaker state"
            );
        }
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("destination", &self.destination)
            .field("config", &self.config)
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{MemoryStore, StoreError};
    use crate::resilience::clock::ManualClock;
    use std::time::Duration;

    const KEY: &str = "circuit-breaker:http://studio.test";

    fn config(
        failure_threshold: u32,
        success_threshold: u32,
        timeout_ms: u64,
    ) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold,
            success_threshold,
            timeout_ms,
        }
    }

    fn breaker(
        config: CircuitBreakerConfig,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
    ) -> CircuitBreaker {
        CircuitBreaker::new("http://studio.test", KEY, config, store, clock)
    }

    /// Store that fails every call.
    struct BrokenStore;

    impl BreakerStore for BrokenStore {
        fn load(&self, _key: &str) -> Result<Option<PersistedBreakerRecord>, StoreError> {
            Err(std::io::Error::other("disk gone").into())
        }

        fn save(&self, _key: &str, _record: &PersistedBreakerRecord) -> Result<(), StoreError> {
            Err(std::io::Error::other("disk gone").into())
        }
    }

    #[test]
    fn test_initial_state_is_closed() {
        let cb = breaker(config(5, 2, 60_000), Arc::default(), Arc::new(ManualClock::new(0)));
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.can_attempt());
        assert_eq!(cb.snapshot(), BreakerSnapshot::default());
    }

    #[test]
    fn test_opens_after_failure_threshold() {
        let clock = Arc::new(ManualClock::new(10_000));
        let cb = breaker(config(3, 2, 60_000), Arc::default(), clock);

        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.failure_count(), 2);

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.can_attempt());
        assert_eq!(cb.snapshot().next_attempt_at, 70_000);
    }

    #[test]
    fn test_success_resets_failure_count() {
        let cb = breaker(config(3, 2, 60_000), Arc::default(), Arc::new(ManualClock::new(0)));

        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        assert_eq!(cb.failure_count(), 0);

        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_open_rejects_until_cooldown_then_probes() {
        let clock = Arc::new(ManualClock::new(0));
        let cb = breaker(config(1, 2, 1_000), Arc::default(), clock.clone());

        cb.record_failure();
        for _ in 0..5 {
            assert!(!cb.can_attempt());
        }
        clock.advance(Duration::from_millis(999));
        assert!(!cb.can_attempt());
        assert_eq!(cb.state(), CircuitState::Open);

        clock.advance(Duration::from_millis(1));
        assert!(cb.can_attempt());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert_eq!(cb.snapshot().success_count, 0);
    }

    #[test]
    fn test_half_open_successes_close_circuit() {
        let clock = Arc::new(ManualClock::new(0));
        let cb = breaker(config(2, 2, 100), Arc::default(), clock.clone());

        cb.record_failure();
        cb.record_failure();
        clock.advance(Duration::from_millis(100));
        assert!(cb.can_attempt());

        cb.record_success();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert_eq!(cb.snapshot().success_count, 1);

        cb.record_success();
        let snapshot = cb.snapshot();
        assert_eq!(snapshot.state, CircuitState::Closed);
        assert_eq!(snapshot.failure_count, 0);
        assert!(cb.can_attempt());
    }

    #[test]
    fn test_half_open_failure_reopens_circuit() {
        let clock = Arc::new(ManualClock::new(0));
        let cb = breaker(config(1, 3, 500), Arc::default(), clock.clone());

        cb.record_failure();
        clock.set(600);
        assert!(cb.can_attempt());
        cb.record_success();

        clock.set(700);
        cb.record_failure();
        let snapshot = cb.snapshot();
        assert_eq!(snapshot.state, CircuitState::Open);
        assert_eq!(snapshot.next_attempt_at, 1_200);
        assert_eq!(snapshot.success_count, 0);
        assert!(!cb.can_attempt());
    }

    #[test]
    fn test_failure_while_open_keeps_cooldown() {
        let clock = Arc::new(ManualClock::new(0));
        let cb = breaker(config(1, 1, 1_000), Arc::default(), clock.clone());

        cb.record_failure();
        clock.set(400);
        cb.record_failure();

        let snapshot = cb.snapshot();
        assert_eq!(snapshot.state, CircuitState::Open);
        assert_eq!(snapshot.failure_count, 2);
        assert_eq!(snapshot.next_attempt_at, 1_000);
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(50));
        let cb = breaker(config(1, 1, 100), store.clone(), clock.clone());
        assert!(store.load(KEY).unwrap().is_none());

        cb.record_failure();
        let record = store.load(KEY).unwrap().unwrap();
        assert_eq!(record.state, CircuitState::Open);
        assert_eq!(record.next_attempt_at, 150);
        assert_eq!(record.timestamp, 50);

        clock.set(150);
        assert!(cb.can_attempt());
        let record = store.load(KEY).unwrap().unwrap();
        assert_eq!(record.state, CircuitState::HalfOpen);
        assert_eq!(record.timestamp, 150);

        cb.record_success();
        assert_eq!(store.load(KEY).unwrap().unwrap().state, CircuitState::Closed);
    }

    #[test]
    fn test_rehydration_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(1_000));

        let first = breaker(config(2, 2, 5_000), store.clone(), clock.clone());
        first.record_failure();
        first.record_failure();
        let before = first.snapshot();
        drop(first);

        let second = breaker(config(2, 2, 5_000), store, clock);
        assert_eq!(second.snapshot(), before);
        assert!(!second.can_attempt());
    }

    #[test]
    fn test_store_failures_are_swallowed() {
        let cb = CircuitBreaker::new(
            "http://studio.test",
            KEY,
            config(1, 1, 10),
            Arc::new(BrokenStore),
            Arc::new(ManualClock::new(0)),
        );
        assert_eq!(cb.state(), CircuitState::Closed);

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        cb.record_success();
        assert_eq!(cb.failure_count(), 0);
    }

    #[test]
    fn test_reset() {
        let store = Arc::new(MemoryStore::new());
        let cb = breaker(config(1, 1, 60_000), store.clone(), Arc::new(ManualClock::new(0)));

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);

        cb.reset();
        assert_eq!(cb.snapshot(), BreakerSnapshot::default());
        assert!(cb.can_attempt());
        assert_eq!(store.load(KEY).unwrap().unwrap().state, CircuitState::Closed);
    }

    #[test]
    fn test_concurrent_probe_transition_happens_once() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(0));
        let cb = Arc::new(breaker(config(1, 1, 10), store, clock.clone()));

        cb.record_failure();
        clock.set(10);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cb = cb.clone();
                std::thread::spawn(move || cb.can_attempt())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }

        let snapshot = cb.snapshot();
        assert_eq!(snapshot.state, CircuitState::HalfOpen);
        assert_eq!(snapshot.success_count, 0);
    }
}
