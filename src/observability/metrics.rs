//! Client metrics.
//!
//! # Metrics
//! - `client_requests_total` (counter): logical requests by method, outcome
//! - `client_request_duration_seconds` (histogram): latency including retries
//! - `client_retries_total` (counter): retry attempts by method
//! - `client_circuit_rejections_total` (counter): fail-fast rejections by destination
//! - `client_circuit_state` (gauge): 0=closed, 1=open, 2=half-open
//!
//! # Design Decisions
//! - Emitted through the `metrics` facade; exporting is left to the host
//! - Outcome labels are a closed set: success, failure, circuit_open, cancelled

use std::time::Duration;

use crate::resilience::CircuitState;

pub fn record_request(method: &str, outcome: &'static str, elapsed: Duration) {
    metrics::counter!(
        "client_requests_total",
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!(
        "client_request_duration_seconds",
        "method" => method.to_string()
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_retry(method: &str) {
    metrics::counter!("client_retries_total", "method" => method.to_string()).increment(1);
}

pub fn record_circuit_rejection(destination: &str) {
    metrics::counter!(
        "client_circuit_rejections_total",
        "destination" => destination.to_string()
    )
    .increment(1);
}

pub fn record_circuit_state(destination: &str, state: CircuitState) {
    metrics::gauge!("client_circuit_state", "destination" => destination.to_string())
        .set(state_value(state));
}

fn state_value(state: CircuitState) -> f64 {
    match state {
        CircuitState::Closed => 0.0,
        CircuitState::Open => 1.0,
        CircuitState::HalfOpen => 2.0,
    }
}
