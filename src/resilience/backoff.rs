//! Exponential backoff.

use std::time::Duration;

/// Delay before retrying after the failed attempt `attempt` (0-indexed).
///
/// `base_ms * 2^attempt`, saturating instead of overflowing.
pub fn calculate_backoff(attempt: u32, base_ms: u64) -> Duration {
    let exponential_base = 2u64.saturating_pow(attempt);
    Duration::from_millis(base_ms.saturating_mul(exponential_base))
}

/// Total time slept across the first `retries` retries.
///
/// Sum of the geometric series: `base_ms * (2^retries - 1)`.
pub fn total_backoff(retries: u32, base_ms: u64) -> Duration {
    let factor = 2u64.saturating_pow(retries).saturating_sub(1);
    Duration::from_millis(base_ms.saturating_mul(factor))
}
