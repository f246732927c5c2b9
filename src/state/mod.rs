//! State management module
//!
//! This module contains the per-repository outcome states and the rate limit
//! window shared across workers.

mod rate_limit;
mod repo_state;

pub use rate_limit::RateLimitState;
pub use repo_state::RepoState;
