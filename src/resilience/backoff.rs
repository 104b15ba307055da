//! Exponential backoff.

use std::time::Duration;

/// Delay before retry number `retry_index` (0 for the first retry).
///
/// Pure doubling with no jitter and no cap: `base_ms * 2^retry_index`,
/// saturating instead of overflowing.
pub fn backoff_delay(base_ms: u64, retry_index: u32) -> Duration {
    let factor = 2u64.saturating_pow(retry_index);
    Duration::from_millis(base_ms.saturating_mul(factor))
}
