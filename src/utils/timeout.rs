//! Protocol timing constants and the transmit retry schedule.

use std::time::Duration;

/// Default deadline for a correlated response.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default window during which discovery replies are collected.
pub const DISCOVERY_WINDOW: Duration = Duration::from_millis(3000);

/// Base delay of the exponential transmit backoff.
pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

/// Delay before retrying after failed transmit attempt `attempt`
/// (zero-based): 100ms, 200ms, 400ms, ...
pub fn retry_delay(attempt: u32) -> Duration {
    RETRY_BASE_DELAY * 2u32.saturating_pow(attempt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(retry_delay(0), Duration::from_millis(100));
        assert_eq!(retry_delay(1), Duration::from_millis(200));
        assert_eq!(retry_delay(2), Duration::from_millis(400));
    }
}
