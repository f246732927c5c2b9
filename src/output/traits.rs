//! Output traits and types
//!
//! This module defines the export sink interface and the summary data a
//! finished crawl hands to the reporting functions.

use crate::model::{Diagnostic, ExportRow};
use crate::state::RepoState;
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to move export into place at {path}: {message}")]
    Persist { path: String, message: String },
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Summary statistics for a crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    // Run metadata
    pub started_at: String,
    pub finished_at: Option<String>,
    pub duration_seconds: Option<u64>,
    pub status: String,
    pub config_hash: Option<String>,
    pub candidate_filename: String,

    // Overall statistics
    pub total_repositories: u64,
    pub rows_exported: u64,

    // Repository outcomes (state -> count)
    pub repos_by_state: HashMap<RepoState, u64>,

    // Every non-fatal failure, repository level and file level
    pub diagnostics: Vec<Diagnostic>,

    // API usage
    pub api_requests: u64,
    pub rate_limit_hits: u64,
}

impl CrawlSummary {
    /// Creates a new empty crawl summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of repositories that ended in `state`
    pub fn count(&self, state: RepoState) -> u64 {
        self.repos_by_state.get(&state).copied().unwrap_or(0)
    }

    /// Returns the number of repositories in terminal states
    pub fn total_terminal_repositories(&self) -> u64 {
        RepoState::terminal_states()
            .iter()
            .map(|state| self.count(*state))
            .sum()
    }

    /// Diagnostics that concern a repository as a whole
    pub fn repository_failures(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.kind.is_repository_level())
            .count()
    }

    /// Diagnostics tied to a single path
    pub fn file_failures(&self) -> usize {
        self.diagnostics.len() - self.repository_failures()
    }

    /// Returns the share of repositories walked to completion as a percentage
    pub fn success_rate(&self) -> f64 {
        let terminal = self.total_terminal_repositories();
        if terminal == 0 {
            return 0.0;
        }
        (self.count(RepoState::Completed) as f64 / terminal as f64) * 100.0
    }

    pub fn was_cancelled(&self) -> bool {
        self.status == "cancelled"
    }
}

/// Trait for export destinations
///
/// A sink receives every row of a run and is finalized exactly once. Rows
/// written to a sink that is dropped without finalizing are discarded.
pub trait ExportSink {
    /// Writes one row
    fn write_row(&mut self, row: &ExportRow) -> OutputResult<()>;

    /// Writes every row in order
    fn write_rows(&mut self, rows: &[ExportRow]) -> OutputResult<()> {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }

    /// Number of rows written so far
    fn rows_written(&self) -> u64;

    /// Flushes the sink and makes the export visible at its destination
    fn finalize(self) -> OutputResult<()>
    where
        Self: Sized;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DiagnosticKind, RepositoryId};

    #[test]
    fn test_crawl_summary_new() {
        let summary = CrawlSummary::new();
        assert_eq!(summary.total_repositories, 0);
        assert_eq!(summary.rows_exported, 0);
        assert_eq!(summary.count(RepoState::Completed), 0);
    }

    #[test]
    fn test_total_terminal_repositories() {
        let mut summary = CrawlSummary::new();
        summary.repos_by_state.insert(RepoState::Completed, 8);
        summary.repos_by_state.insert(RepoState::Failed, 1);
        summary.repos_by_state.insert(RepoState::Skipped, 3);

        assert_eq!(summary.total_terminal_repositories(), 12);
    }

    #[test]
    fn test_success_rate() {
        let mut summary = CrawlSummary::new();
        summary.repos_by_state.insert(RepoState::Completed, 3);
        summary.repos_by_state.insert(RepoState::TimedOut, 1);

        assert!((summary.success_rate() - 75.0).abs() < 0.01);
        assert_eq!(CrawlSummary::new().success_rate(), 0.0);
    }

    #[test]
    fn test_failure_counts() {
        let repo = RepositoryId::from("org/app");
        let mut summary = CrawlSummary::new();
        summary.diagnostics = vec![
            Diagnostic::repository(repo.clone(), DiagnosticKind::RepositoryUnreachable, "404"),
            Diagnostic::file(repo.clone(), "a/bfile", DiagnosticKind::Parse, "bad"),
            Diagnostic::file(repo, "b/bfile", DiagnosticKind::Decode, "bad"),
        ];

        assert_eq!(summary.repository_failures(), 1);
        assert_eq!(summary.file_failures(), 2);
    }
}
