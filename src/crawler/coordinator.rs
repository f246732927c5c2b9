//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the run loop that coordinates a crawl:
//! - Handing repositories to a bounded pool of workers
//! - Walking each repository under an optional deadline
//! - Funnelling rows and diagnostics through a single aggregator task
//! - Handling cancellation and building the run summary

use crate::api::RepositoryApi;
use crate::config::CrawlerConfig;
use crate::crawler::scheduler::{CancelSignal, ScheduledRepository, Scheduler};
use crate::crawler::walker::{TreeWalker, WalkItem};
use crate::model::{Diagnostic, DiagnosticKind, ExportRow, RepositoryId};
use crate::output::CrawlSummary;
use crate::state::RepoState;
use crate::ScoutError;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Everything one worker produced for one repository
#[derive(Debug, Clone)]
pub struct RepositoryOutcome {
    pub repository: RepositoryId,
    pub state: RepoState,
    pub rows: Vec<ExportRow>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RepositoryOutcome {
    fn skipped(repository: RepositoryId) -> Self {
        Self {
            repository,
            state: RepoState::Skipped,
            rows: Vec::new(),
            diagnostics: Vec::new(),
        }
    }
}

/// Result of a crawl run
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// Every row extracted, in no particular order
    pub rows: Vec<ExportRow>,

    /// Final state of every repository
    pub repo_states: HashMap<RepositoryId, RepoState>,

    pub summary: CrawlSummary,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    api: Arc<dyn RepositoryApi>,
    candidate_filename: String,
    max_concurrent: usize,
    repo_timeout: Option<Duration>,
    cancel: CancelSignal,
}

impl Coordinator {
    /// Creates a new coordinator
    ///
    /// # Arguments
    ///
    /// * `api` - The hosting API shared by every worker
    /// * `config` - The crawler configuration
    /// * `cancel` - Shared cancellation flag
    pub fn new(api: Arc<dyn RepositoryApi>, config: &CrawlerConfig, cancel: CancelSignal) -> Self {
        Self {
            api,
            candidate_filename: config.candidate_filename.clone(),
            max_concurrent: config.max_concurrent_repos as usize,
            repo_timeout: config.repo_timeout(),
            cancel,
        }
    }

    /// Runs the crawl over `repositories`
    ///
    /// This method:
    /// 1. Starts the aggregator task
    /// 2. Hands repositories to at most `max_concurrent` workers at a time
    /// 3. Marks repositories never started as skipped once cancelled
    /// 4. Waits for every worker and builds the report
    ///
    /// Failures inside a repository never abort the run; they end up as
    /// diagnostics in the report.
    pub async fn run(&self, repositories: Vec<RepositoryId>) -> Result<CrawlReport, ScoutError> {
        let started_at = Utc::now();
        let start_time = Instant::now();
        let total = repositories.len();

        tracing::info!(
            "Starting crawl of {} repositories with {} workers",
            total,
            self.max_concurrent
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let aggregator = tokio::spawn(aggregate(rx, total));

        let mut scheduler = Scheduler::new(self.max_concurrent, repositories, self.cancel.clone());
        let mut workers = JoinSet::new();

        while let Some(scheduled) = scheduler.next_repository().await {
            let ScheduledRepository {
                repository,
                _permit: permit,
            } = scheduled;

            let api = self.api.clone();
            let candidate = self.candidate_filename.clone();
            let timeout = self.repo_timeout;
            let cancel = self.cancel.clone();
            let tx = tx.clone();

            workers.spawn(async move {
                let outcome = walk_repository(api, repository, &candidate, timeout, cancel).await;
                drop(permit);
                // The receiver lives until every sender is gone
                let _ = tx.send(outcome);
            });
        }

        let skipped = scheduler.drain_remaining();
        if !skipped.is_empty() {
            tracing::warn!(
                "Crawl cancelled, skipping {} repositories not yet started",
                skipped.len()
            );
        }
        for repository in skipped {
            let _ = tx.send(RepositoryOutcome::skipped(repository));
        }
        drop(tx);

        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                tracing::error!("Worker task failed: {}", e);
            }
        }

        let aggregate = aggregator
            .await
            .map_err(|e| ScoutError::Worker(e.to_string()))?;

        let finished_at = Utc::now();
        let usage = self.api.usage();
        let cancelled = self.cancel.is_cancelled();

        let mut repos_by_state = HashMap::new();
        for state in aggregate.states.values() {
            *repos_by_state.entry(*state).or_insert(0u64) += 1;
        }

        let summary = CrawlSummary {
            started_at: started_at.to_rfc3339(),
            finished_at: Some(finished_at.to_rfc3339()),
            duration_seconds: Some((finished_at - started_at).num_seconds().max(0) as u64),
            status: if cancelled { "cancelled" } else { "completed" }.to_string(),
            config_hash: None,
            candidate_filename: self.candidate_filename.clone(),
            total_repositories: total as u64,
            rows_exported: aggregate.rows.len() as u64,
            repos_by_state,
            diagnostics: aggregate.diagnostics,
            api_requests: usage.requests,
            rate_limit_hits: usage.rate_limit_hits,
        };

        tracing::info!(
            "Crawl {}: {} repositories, {} rows, {} diagnostics in {:?}",
            summary.status,
            total,
            summary.rows_exported,
            summary.diagnostics.len(),
            start_time.elapsed()
        );

        Ok(CrawlReport {
            rows: aggregate.rows,
            repo_states: aggregate.states,
            summary,
        })
    }
}

/// Walks one repository to completion, deadline or cancellation
async fn walk_repository(
    api: Arc<dyn RepositoryApi>,
    repository: RepositoryId,
    candidate: &str,
    timeout: Option<Duration>,
    cancel: CancelSignal,
) -> RepositoryOutcome {
    tracing::debug!("Walking {}", repository);

    let deadline = timeout.map(|t| tokio::time::Instant::now() + t);
    let mut walker = TreeWalker::new(api, repository.clone(), "", candidate, cancel);
    let mut rows = Vec::new();
    let mut diagnostics = Vec::new();

    loop {
        let item = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, walker.next()).await {
                Ok(item) => item,
                Err(_) => {
                    tracing::warn!("Timed out walking {}, dropping its rows", repository);
                    diagnostics.push(Diagnostic::repository(
                        repository.clone(),
                        DiagnosticKind::RepositoryTimeout,
                        format!(
                            "Walk did not finish within {}s",
                            timeout.map(|t| t.as_secs()).unwrap_or_default()
                        ),
                    ));
                    return RepositoryOutcome {
                        repository,
                        state: RepoState::TimedOut,
                        rows: Vec::new(),
                        diagnostics,
                    };
                }
            },
            None => walker.next().await,
        };

        match item {
            Some(WalkItem::Row(row)) => rows.push(row),
            Some(WalkItem::Diagnostic(diagnostic)) => diagnostics.push(diagnostic),
            None => break,
        }
    }

    let state = if walker.root_failed() {
        RepoState::Failed
    } else if walker.was_cancelled() {
        RepoState::Cancelled
    } else {
        RepoState::Completed
    };

    tracing::debug!(
        "{} {}: {} rows, {} diagnostics",
        repository,
        state,
        rows.len(),
        diagnostics.len()
    );

    RepositoryOutcome {
        repository,
        state,
        rows,
        diagnostics,
    }
}

#[derive(Debug, Default)]
struct Aggregate {
    rows: Vec<ExportRow>,
    diagnostics: Vec<Diagnostic>,
    states: HashMap<RepositoryId, RepoState>,
}

/// Single consumer of worker outcomes
async fn aggregate(mut rx: mpsc::UnboundedReceiver<RepositoryOutcome>, total: usize) -> Aggregate {
    let mut aggregate = Aggregate::default();
    let start_time = Instant::now();
    let mut processed = 0usize;

    while let Some(outcome) = rx.recv().await {
        processed += 1;
        aggregate.rows.extend(outcome.rows);
        aggregate.diagnostics.extend(outcome.diagnostics);
        aggregate.states.insert(outcome.repository, outcome.state);

        if processed % 10 == 0 || processed == total {
            let rate = processed as f64 / start_time.elapsed().as_secs_f64().max(f64::EPSILON);
            tracing::info!(
                "Progress: {}/{} repositories, {} rows, {:.2} repos/sec",
                processed,
                total,
                aggregate.rows.len(),
                rate
            );
        } else {
            tracing::debug!("Progress: {}/{} repositories", processed, total);
        }
    }

    aggregate
}
