//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root configuration for the API client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientSettings {
    /// Destination, timeout and retry settings.
    pub client: ClientConfig,

    /// Circuit breaker thresholds.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Where breaker state is persisted between runs.
    pub persistence: PersistenceConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Per-client request settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL every request path is joined onto (e.g., "http://localhost:5005/api").
    pub base_destination: String,

    /// Upper bound for a single attempt, in milliseconds.
    pub request_timeout_ms: u64,

    /// Number of retries after the initial attempt.
    pub max_retry_attempts: u32,

    /// Delay before the first retry; doubles for every subsequent retry.
    pub base_retry_delay_ms: u64,

    /// Header carrying the per-attempt correlation ID.
    pub correlation_header: String,

    /// Granularity of circuit breakers.
    pub breaker_scope: BreakerScope,

    /// Headers attached to every request unless overridden per call.
    pub default_headers: BTreeMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_destination: "http://localhost:5005/api".to_string(),
            request_timeout_ms: 30_000,
            max_retry_attempts: 3,
            base_retry_delay_ms: 1_000,
            correlation_header: "X-Correlation-ID".to_string(),
            breaker_scope: BreakerScope::Destination,
            default_headers: BTreeMap::new(),
        }
    }
}

/// How requests are grouped onto circuit breakers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BreakerScope {
    /// One breaker for the whole base destination.
    #[default]
    Destination,
    /// One breaker per first path segment under the base destination.
    Endpoint,
}

/// Circuit breaker thresholds. Immutable once a breaker is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,

    /// Consecutive half-open successes that close the circuit.
    pub success_threshold: u32,

    /// Cooldown before an open circuit admits a probe, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout_ms: 60_000,
        }
    }
}

/// Breaker state persistence.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Storage medium.
    pub backend: PersistenceBackend,

    /// JSON file used by the file backend.
    pub path: String,

    /// Prefix prepended to every breaker key.
    pub key_prefix: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: PersistenceBackend::Memory,
            path: "circuit-breakers.json".to_string(),
            key_prefix: "circuit-breaker:".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceBackend {
    /// Lives as long as the process.
    #[default]
    Memory,
    /// Survives restarts.
    File,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Colored terminal output.
    pub ansi: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            ansi: true,
        }
    }
}
