//! Retry decisions.
//!
//! # Design Decisions
//! - A retry needs all three: budget left, a transient failure, and a breaker
//!   that still admits attempts
//! - The breaker is consulted last because the check can move an open
//!   breaker to half-open
//! - Every HTTP verb is retried alike; callers own idempotency

use std::time::Duration;

use crate::resilience::backoff::backoff_delay;

/// Why a failed request will not be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUpReason {
    /// The configured number of retries has been spent.
    Exhausted,
    /// The failure is not expected to clear on its own (e.g., 404).
    NotTransient,
    /// The breaker opened, possibly because of this very failure.
    CircuitOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { delay: Duration },
    GiveUp(GiveUpReason),
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
        }
    }

    /// Decide what to do after a failed attempt.
    ///
    /// `retries_so_far` counts retries already issued for this call.
    /// `breaker_allows` is only invoked when the other two conditions hold.
    pub fn decide(
        &self,
        retries_so_far: u32,
        transient: bool,
        breaker_allows: impl FnOnce() -> bool,
    ) -> RetryDecision {
        if retries_so_far >= self.max_retries {
            return RetryDecision::GiveUp(GiveUpReason::Exhausted);
        }
        if !transient {
            return RetryDecision::GiveUp(GiveUpReason::NotTransient);
        }
        if !breaker_allows() {
            return RetryDecision::GiveUp(GiveUpReason::CircuitOpen);
        }
        RetryDecision::Retry {
            delay: backoff_delay(self.base_delay_ms, retries_so_far),
        }
    }
}
