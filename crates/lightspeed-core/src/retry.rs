//! Retry configuration and backoff math.
//!
//! The async retry loops live in `lightspeed-http` and
//! `lightspeed-gateway`; this module holds the portable, sync-only
//! building blocks:
//!
//! - [`RetryConfig`]: retry parameters (max retries, backoff, jitter)
//! - [`backoff_delay`] / [`backoff_delay_with_random`]: exponential
//!   backoff with jitter
//! - [`parse_retry_after`]: parse a `Retry-After` HTTP header

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default maximum retries for transient transport failures.
pub const DEFAULT_MAX_RETRIES: u32 = 4;
/// Default base delay in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 500;
/// Default maximum delay in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;
/// Default jitter factor (0.0–1.0).
pub const DEFAULT_JITTER_FACTOR: f64 = 0.2;

/// Configuration for retry behavior on transient failures.
///
/// Applies to network errors and retryable 5xx responses. Rate-limit
/// waits are driven by the server's retry-after value instead and do not
/// consume attempts.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 4).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay for exponential backoff in ms (default: 500).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Maximum delay between retries in ms (default: 30000).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Jitter factor 0.0–1.0 (default: 0.2).
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY_MS
}
fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY_MS
}
fn default_jitter_factor() -> f64 {
    DEFAULT_JITTER_FACTOR
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            jitter_factor: DEFAULT_JITTER_FACTOR,
        }
    }
}

/// Calculate the exponential backoff delay for a retry attempt, without
/// randomness.
///
/// Formula: `min(max_delay, base_delay * 2^attempt)`. `attempt` is
/// zero-based (0 for the first retry).
#[must_use]
pub fn backoff_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let exponential = config
        .base_delay_ms
        .saturating_mul(1u64 << attempt.min(31));
    Duration::from_millis(exponential.min(config.max_delay_ms))
}

/// Calculate the backoff delay with explicit randomness.
///
/// `random` should be a value in `[0.0, 1.0)` from a PRNG. The jitter is
/// symmetric: a factor of 0.2 varies the delay by ±20%.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn backoff_delay_with_random(attempt: u32, config: &RetryConfig, random: f64) -> Duration {
    let capped = backoff_delay(attempt, config).as_millis() as f64;
    // Maps random [0,1) to [-jitter, +jitter]
    let jitter = 1.0 + (random * 2.0 - 1.0) * config.jitter_factor;
    Duration::from_millis((capped * jitter).round().max(0.0) as u64)
}

/// Parse a `Retry-After` HTTP header value.
///
/// The value can be either a number of seconds (e.g. `"120"`) or an
/// HTTP-date. Returns `None` if parsing fails; past dates clamp to zero.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value) {
        let delay = date.signed_duration_since(chrono::Utc::now());
        return Some(delay.to_std().unwrap_or(Duration::ZERO));
    }

    None
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_config_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 4);
        assert_eq!(config.base_delay_ms, 500);
        assert_eq!(config.max_delay_ms, 30_000);
        assert!((config.jitter_factor - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn retry_config_serde_defaults() {
        let config: RetryConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_retries, 4);
        assert_eq!(config.base_delay_ms, 500);
    }

    #[test]
    fn backoff_exponential_growth() {
        let config = RetryConfig {
            base_delay_ms: 1000,
            jitter_factor: 0.0,
            ..RetryConfig::default()
        };
        assert_eq!(backoff_delay(0, &config), Duration::from_millis(1000));
        assert_eq!(backoff_delay(1, &config), Duration::from_millis(2000));
        assert_eq!(backoff_delay(2, &config), Duration::from_millis(4000));
        assert_eq!(backoff_delay(3, &config), Duration::from_millis(8000));
    }

    #[test]
    fn backoff_caps_at_max() {
        let config = RetryConfig::default();
        assert_eq!(
            backoff_delay(30, &config),
            Duration::from_millis(config.max_delay_ms)
        );
    }

    #[test]
    fn backoff_high_attempt_no_overflow() {
        let config = RetryConfig::default();
        let delay = backoff_delay(u32::MAX, &config);
        assert!(delay <= Duration::from_millis(config.max_delay_ms));
    }

    #[test]
    fn backoff_with_random_bounds() {
        let config = RetryConfig {
            base_delay_ms: 1000,
            max_delay_ms: 60_000,
            jitter_factor: 0.2,
            ..RetryConfig::default()
        };
        // random = 0.0 → 1 - 0.2 = 0.8x
        assert_eq!(
            backoff_delay_with_random(0, &config, 0.0),
            Duration::from_millis(800)
        );
        // random = 0.5 → 1.0x
        assert_eq!(
            backoff_delay_with_random(0, &config, 0.5),
            Duration::from_millis(1000)
        );
        // random = 1.0 → 1.2x
        assert_eq!(
            backoff_delay_with_random(0, &config, 1.0),
            Duration::from_millis(1200)
        );
    }

    #[test]
    fn parse_retry_after_seconds() {
        assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
        assert_eq!(parse_retry_after("0"), Some(Duration::ZERO));
    }

    #[test]
    fn parse_retry_after_invalid() {
        assert_eq!(parse_retry_after("not-a-number"), None);
        assert_eq!(parse_retry_after(""), None);
    }

    #[test]
    fn parse_retry_after_http_date() {
        use chrono::{TimeZone, Utc};
        let future = Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap().to_rfc2822();
        assert!(parse_retry_after(&future).unwrap() > Duration::ZERO);

        let past = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap().to_rfc2822();
        assert_eq!(parse_retry_after(&past), Some(Duration::ZERO));
    }
}
