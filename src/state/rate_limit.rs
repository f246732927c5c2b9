use std::time::{Duration, Instant};

/// Tracks the API rate limit shared by every worker of a run
///
/// When any call is rate limited, every worker holds off until the reported
/// reset instant instead of hammering the API independently.
#[derive(Debug, Clone, Default)]
pub struct RateLimitState {
    /// Number of requests sent in the current run
    pub request_count: u64,

    /// Number of rate-limit responses received
    pub rate_limit_hits: u64,

    /// Instant before which no new request should be sent
    pub limited_until: Option<Instant>,
}

impl RateLimitState {
    /// Creates a new RateLimitState with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that a request is about to be sent
    pub fn record_request(&mut self) {
        self.request_count += 1;
    }

    /// Marks the API as rate limited until `now + wait`
    ///
    /// An existing later deadline is kept.
    pub fn mark_rate_limited(&mut self, now: Instant, wait: Duration) {
        self.rate_limit_hits += 1;
        let until = now + wait;
        self.limited_until = Some(match self.limited_until {
            Some(existing) if existing > until => existing,
            _ => until,
        });
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(&self, now: Instant) -> Option<Duration> {
        match self.limited_until {
            Some(until) if until > now => Some(until - now),
            _ => None,
        }
    }

    /// Clears an elapsed rate limit window
    pub fn clear_if_elapsed(&mut self, now: Instant) {
        if matches!(self.limited_until, Some(until) if until <= now) {
            self.limited_until = None;
        }
    }
}
