//! Serialized breaker snapshot.

use serde::{Deserialize, Serialize};

use crate::resilience::circuit_breaker::CircuitState;

/// A breaker's full state plus the time it was written.
///
/// Field names are camelCase on disk so records stay readable by other
/// front-ends sharing the same store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedBreakerRecord {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    /// Unix time (ms) before which an open circuit rejects attempts.
    pub next_attempt_at: u64,
    /// Unix time (ms) of the write.
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let record = PersistedBreakerRecord {
            state: CircuitState::HalfOpen,
            failure_count: 5,
            success_count: 1,
            next_attempt_at: 1_700_000_060_000,
            timestamp: 1_700_000_000_000,
        };

        let json = serde_json::to_value(record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "state": "HALF_OPEN",
                "failureCount": 5,
                "successCount": 1,
                "nextAttemptAt": 1_700_000_060_000u64,
                "timestamp": 1_700_000_000_000u64,
            })
        );
    }
}
