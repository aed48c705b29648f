//! Retry and backoff helpers for model artifact fetches.

use std::time::Duration;

/// Retry attempts for transient network errors during a fetch.
pub const DEFAULT_NETWORK_RETRIES: u32 = 3;

/// Base delay for exponential backoff.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Delay cap for exponential backoff.
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(30);

/// Whether a reqwest error is worth retrying.
///
/// Connection failures, timeouts, and interrupted bodies usually clear
/// up on their own; anything else will not improve on retry. HTTP
/// status codes never reach this function, the client classifies those
/// itself.
pub fn is_transient_network_error(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout() || error.is_body()
}

/// Exponential backoff delay with jitter:
/// min(base * 2^attempt + jitter, max), jitter = base/2 capped at 500ms.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    let exponential = base.saturating_mul(2u32.saturating_pow(attempt));
    let jitter_ms = (base.as_millis() as u64).min(1000);
    let jitter = Duration::from_millis(jitter_ms / 2);
    exponential.saturating_add(jitter).min(max)
}
