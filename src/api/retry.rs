//! Retry and backoff policy
//!
//! | Condition | Action |
//! |-----------|--------|
//! | HTTP 429, or 403 with rate limit headers | Retry after `Retry-After` or the reset, pausing every worker |
//! | Other HTTP 403 | Retry with exponential backoff |
//! | HTTP 5xx | Retry with exponential backoff |
//! | Timeout | Retry with exponential backoff |
//! | Connection refused | Immediate failure |
//! | Any other status | Immediate failure |

use crate::config::CrawlerConfig;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::time::Duration;

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.backoff_base_ms),
            max_delay: Duration::from_millis(config.backoff_max_ms),
        }
    }

    /// Returns true for statuses that signal rate limiting
    pub fn is_rate_limit_status(status: StatusCode) -> bool {
        status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS
    }

    /// Returns true when a response reports an exhausted rate limit
    ///
    /// A 403 only counts when it carries `Retry-After` or
    /// `x-ratelimit-remaining: 0`; without them it is a permission failure.
    pub fn is_rate_limited(status: StatusCode, headers: &HeaderMap) -> bool {
        match status {
            StatusCode::TOO_MANY_REQUESTS => true,
            StatusCode::FORBIDDEN => {
                headers.contains_key("retry-after")
                    || header_u64(headers, "x-ratelimit-remaining") == Some(0)
            }
            _ => false,
        }
    }

    /// Returns true for statuses worth another attempt
    pub fn is_retryable_status(status: StatusCode) -> bool {
        Self::is_rate_limit_status(status) || status.is_server_error()
    }

    /// Delay before retry number `attempt + 1`: `base * 2^attempt`, capped
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Delay before retrying a failed response
    ///
    /// `Retry-After` (in seconds) wins, then an exhausted rate limit window
    /// (`x-ratelimit-remaining: 0` with `x-ratelimit-reset` as epoch seconds),
    /// then plain backoff. The result never exceeds `max_delay`.
    pub fn delay_for_response(&self, attempt: u32, headers: &HeaderMap, now_epoch: i64) -> Duration {
        if let Some(seconds) = header_u64(headers, "retry-after") {
            return Duration::from_secs(seconds).min(self.max_delay);
        }

        if header_u64(headers, "x-ratelimit-remaining") == Some(0) {
            if let Some(reset) = header_u64(headers, "x-ratelimit-reset") {
                let wait = (reset as i64 - now_epoch).max(0) as u64;
                return Duration::from_secs(wait).min(self.max_delay);
            }
        }

        self.backoff(attempt)
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
