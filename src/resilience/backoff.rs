//! Accept-error backoff strategies.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// How long the accept loop pauses after a failed `accept()`.
///
/// The default (`None`) retries immediately, yielding to the scheduler only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum AcceptBackoff {
    /// Retry immediately.
    #[default]
    None,
    /// Constant pause after every failure.
    Fixed { delay_ms: u64 },
    /// Doubling pause per consecutive failure, capped, with jitter.
    Exponential { base_ms: u64, max_ms: u64 },
}

impl AcceptBackoff {
    /// Delay to apply after `consecutive_failures` failed accepts in a row.
    ///
    /// Returns `None` when the loop should continue without sleeping.
    pub fn delay(&self, consecutive_failures: u32) -> Option<Duration> {
        match *self {
            AcceptBackoff::None => None,
            AcceptBackoff::Fixed { delay_ms } => Some(Duration::from_millis(delay_ms)),
            AcceptBackoff::Exponential { base_ms, max_ms } => {
                Some(calculate_backoff(consecutive_failures, base_ms, max_ms))
            }
        }
    }

    /// Whether this strategy ever sleeps.
    pub fn is_none(&self) -> bool {
        matches!(self, AcceptBackoff::None)
    }
}

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Jitter: 0 to 10% of the delay
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        let b1 = calculate_backoff(1, 100, 2000);
        assert!(b1.as_millis() >= 100);

        let b2 = calculate_backoff(2, 100, 2000);
        assert!(b2.as_millis() >= 200);

        let max = calculate_backoff(10, 100, 1000);
        assert!(max.as_millis() >= 1000);
        assert!(max.as_millis() < 1100);
    }

    #[test]
    fn none_never_sleeps() {
        let backoff = AcceptBackoff::default();
        assert!(backoff.is_none());
        assert_eq!(backoff.delay(1), None);
        assert_eq!(backoff.delay(u32::MAX), None);
    }

    #[test]
    fn fixed_is_constant() {
        let backoff = AcceptBackoff::Fixed { delay_ms: 25 };
        assert_eq!(backoff.delay(1), Some(Duration::from_millis(25)));
        assert_eq!(backoff.delay(40), Some(Duration::from_millis(25)));
    }

    #[test]
    fn exponential_grows_until_cap() {
        let backoff = AcceptBackoff::Exponential { base_ms: 10, max_ms: 80 };
        let first = backoff.delay(1).unwrap();
        let third = backoff.delay(3).unwrap();
        let late = backoff.delay(30).unwrap();
        assert!(first >= Duration::from_millis(10) && first < Duration::from_millis(20));
        assert!(third >= Duration::from_millis(40));
        assert!(late >= Duration::from_millis(80) && late < Duration::from_millis(88));
    }

    #[test]
    fn deserializes_tagged_strategy() {
        #[derive(Deserialize)]
        struct Wrapper {
            accept_backoff: AcceptBackoff,
        }

        let parsed: Wrapper =
            toml::from_str("accept_backoff = { strategy = \"fixed\", delay_ms = 5 }").unwrap();
        assert_eq!(parsed.accept_backoff, AcceptBackoff::Fixed { delay_ms: 5 });
    }
}
