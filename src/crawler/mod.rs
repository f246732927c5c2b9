//! Crawler module for repository walking and metadata extraction
//!
//! This module contains the core crawling logic, including:
//! - Base64 decoding of fetched file bodies
//! - Metadata parsing of candidate files
//! - Depth-first tree walking per repository
//! - Worker scheduling and overall crawl coordination

mod coordinator;
mod decoder;
mod parser;
mod scheduler;
mod walker;

pub use coordinator::{Coordinator, CrawlReport, RepositoryOutcome};
pub use decoder::{decode, decode_body, decode_file};
pub use parser::{parse_metadata, EnvironmentValue, ManagedFileRecord};
pub use scheduler::{CancelSignal, ScheduledRepository, Scheduler};
pub use walker::{walk, TreeWalker, WalkItem, WalkOutcome};

use crate::api::{GitHubClient, RepositoryApi};
use crate::config::ResolvedConfig;
use crate::output::{generate_markdown_summary, CsvExport, ExportSink};
use crate::source::{describe, load_repositories};
use crate::{ScoutError, SourceError};
use std::sync::Arc;

/// Runs a complete crawl operation against the GitHub API
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the export destination
/// 2. Build the HTTP client
/// 3. Load the repositories to scan
/// 4. Walk every repository with a bounded worker pool
/// 5. Write the CSV export and the optional run report
///
/// # Arguments
///
/// * `config` - The resolved configuration
/// * `cancel` - Cancellation flag, typically wired to Ctrl-C
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The crawl ran to completion or was cancelled
/// * `Err(ScoutError)` - A fatal error stopped the run
///
/// # Example
///
/// ```no_run
/// use bfile_scout::config::{load_config, resolve_config, resolve_credential};
/// use bfile_scout::crawler::{crawl, CancelSignal};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("scout.toml"))?;
/// let credential = resolve_credential(&config.api.token_env)?;
/// let resolved = resolve_config(config, None, credential)?;
/// let report = crawl(&resolved, CancelSignal::new()).await?;
/// println!("{} managed files", report.rows.len());
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: &ResolvedConfig, cancel: CancelSignal) -> Result<CrawlReport, ScoutError> {
    let client = GitHubClient::new(
        &config.config.api,
        &config.config.crawler,
        &config.credential,
    )?;
    crawl_with_api(config, Arc::new(client), cancel).await
}

/// Runs a complete crawl against any [`RepositoryApi`]
pub async fn crawl_with_api(
    config: &ResolvedConfig,
    api: Arc<dyn RepositoryApi>,
    cancel: CancelSignal,
) -> Result<CrawlReport, ScoutError> {
    let output = &config.config.output;

    // Fails before any network call when the destination is not writable
    let mut export = CsvExport::create(&output.csv_path, output.utf8_bom)?;

    tracing::info!("Loading repositories from {}", describe(&config.source));
    let repositories = match load_repositories(&config.source, api.as_ref()).await {
        Ok(repositories) => repositories,
        Err(SourceError::OrgListing { org, status }) => {
            tracing::warn!(
                "Could not list repositories of {} (HTTP {}), continuing with none",
                org,
                status
            );
            Vec::new()
        }
        Err(e) => return Err(e.into()),
    };

    let coordinator = Coordinator::new(api, &config.config.crawler, cancel);
    let mut report = coordinator.run(repositories).await?;
    report.summary.config_hash = config.config_hash.clone();

    report.rows.sort();
    export.write_rows(&report.rows)?;
    export.finalize()?;

    if let Some(summary_path) = &output.summary_path {
        generate_markdown_summary(&report.summary, summary_path)?;
    }

    Ok(report)
}
