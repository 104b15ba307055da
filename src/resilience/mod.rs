//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to destination:
//!     → registry.rs (breaker for this destination, created lazily)
//!     → circuit_breaker.rs (can we attempt? fail fast if open)
//!     → timeouts.rs (enforce request timeout, honour cancellation)
//!     → On failure: retries.rs (transient? budget left? breaker still closed?)
//!     → backoff.rs (base * 2^retry before the next attempt)
//!     → circuit_breaker.rs (every outcome recorded and persisted)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every attempt has a deadline
//! - Cancellation is the caller's decision and never counts as a failure
//! - Circuit breaker prevents hammering a destination that is down
//! - Breaker deadlines use wall-clock time (clock.rs) so they survive restarts

pub mod backoff;
pub mod circuit_breaker;
pub mod clock;
pub mod registry;
pub mod retries;
pub mod timeouts;

pub use backoff::backoff_delay;
pub use circuit_breaker::{BreakerSnapshot, CircuitBreaker, CircuitState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use registry::BreakerRegistry;
pub use retries::{GiveUpReason, RetryDecision, RetryPolicy};
