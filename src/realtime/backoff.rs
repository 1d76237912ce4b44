//! Exponential backoff with jitter for reconnect attempts.
//!
//! ```text
//! attempt   delay (base = 500ms, max = 30s)   with jitter (±20%)
//! 0         500ms                             400ms - 600ms
//! 1         1s                                800ms - 1.2s
//! 2         2s                                1.6s  - 2.4s
//! ...
//! 6+        30s                               24s   - 36s
//! ```

use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Fraction of the delay added or removed at random (0.0 - 1.0).
    pub jitter_factor: f64,
    /// Reconnect attempts allowed after the first connect fails or the
    /// connection drops. The initial connect is not counted, so a server that
    /// never answers sees `max_attempts + 1` connects before giving up.
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl BackoffConfig {
    /// 500ms base, 30s cap, 20% jitter, 10 attempts.
    pub fn standard() -> Self {
        Self {
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            jitter_factor: 0.2,
            max_attempts: 10,
        }
    }

    /// Short delays for local development and tests.
    pub fn aggressive() -> Self {
        Self {
            base_delay_ms: 10,
            max_delay_ms: 200,
            jitter_factor: 0.1,
            max_attempts: 3,
        }
    }

    /// `min(base * 2^attempt, max)` plus or minus jitter.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
        let delay = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);

        let jitter_range = (delay as f64 * self.jitter_factor.clamp(0.0, 1.0)) as i64;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0
        };

        let delay = i64::try_from(delay).unwrap_or(i64::MAX).saturating_add(jitter);
        Duration::from_millis(u64::try_from(delay).unwrap_or(0))
    }

    pub fn can_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}
