/// Repository outcome states
///
/// Every repository of a run ends in exactly one of these.
use std::fmt;

/// How the crawl of a repository ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RepoState {
    // ===== Success States =====
    /// The whole tree was walked (individual files may still have failed)
    Completed,

    // ===== Error States =====
    /// The root listing failed; nothing was walked
    Failed,

    /// The per-repository deadline elapsed before the walk finished
    TimedOut,

    // ===== Special States =====
    /// The run was cancelled while this repository was being walked
    Cancelled,

    /// The run was cancelled before this repository was started
    Skipped,
}

impl RepoState {
    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns true if this represents a repository-level failure
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed | Self::TimedOut)
    }

    /// Returns true if the repository was cut short by cancellation
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Skipped)
    }

    /// Terminal states in report order
    pub fn terminal_states() -> [RepoState; 5] {
        [
            Self::Completed,
            Self::Failed,
            Self::TimedOut,
            Self::Cancelled,
            Self::Skipped,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for RepoState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
