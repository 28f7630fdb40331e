//! Retry backoff for carrier calls.
//!
//! The gateway retries rate lookups (and keyed shipment creations) on
//! retryable [`CarrierError`](crate::CarrierError)s, sleeping the backoff
//! delay between attempts. Whether an error is retryable is decided where it
//! is classified; this module only answers "how long to wait".

use std::time::Duration;

/// Backoff strategy between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Fixed delay between retries.
    Fixed { delay: Duration },
    /// Exponential delay, `base * (factor ^ attempt)`, capped at `max`.
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
        /// Apply random jitter (+/- 50%) to the delay.
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(200),
            factor: 2.0,
            max: Duration::from_secs(3),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Delay before retry `attempt` (0-based).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let grown = base.as_secs_f64() * factor.powi(attempt as i32);
                let capped = Duration::from_secs_f64(grown.min(max.as_secs_f64()));
                if jitter {
                    spread(capped)
                } else {
                    capped
                }
            }
        }
    }
}

/// Uniform +/- 50% spread around `delay`, floored at zero.
fn spread(delay: Duration) -> Duration {
    let millis = delay.as_millis() as u64;
    let half = millis / 2;
    let offset = fastrand::u64(0..=half * 2) as i64 - half as i64;
    Duration::from_millis((millis as i64 + offset).max(0) as u64)
}

/// Retry policy applied by the gateway.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub enabled: bool,
    /// Retries after the first attempt. Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 2,
            backoff: Backoff::default(),
        }
    }
}

impl RetryConfig {
    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Fixed { delay },
            ..Self::default()
        }
    }

    pub fn no_retry() -> Self {
        Self {
            enabled: false,
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}
