//! Resilient HTTP client for the studio backend API.
//!
//! Every request is gated by a persisted circuit breaker, tagged with a fresh
//! correlation ID per attempt, retried on transient failures with exponential
//! backoff, and fails with a normalized, user-presentable error.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod persistence;
pub mod resilience;

pub use config::schema::ClientSettings;
pub use http::{ApiClient, ClientError, NormalizedError, RequestOptions};
pub use lifecycle::{CancelHandle, CancelToken};
pub use resilience::CircuitState;
