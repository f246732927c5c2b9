//! bfile-scout main entry point
//!
//! This is the command-line interface for the bfile-scout repository crawler.

use anyhow::Context;
use bfile_scout::config::{
    load_config_with_hash, resolve_config, resolve_credential, Config, ResolvedConfig,
    SourceConfig,
};
use bfile_scout::crawler::{crawl, CancelSignal};
use bfile_scout::output::print_statistics;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// bfile-scout: managed bfile discovery for GitHub
///
/// bfile-scout walks every file tree of a set of repositories, reads the
/// metadata of each managed `bfile` it finds and exports one CSV row per file.
#[derive(Parser, Debug)]
#[command(name = "bfile-scout")]
#[command(version)]
#[command(about = "Finds managed bfiles across GitHub repositories", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Scan every repository of this organization
    #[arg(long, conflicts_with = "repo_list")]
    org: Option<String>,

    /// Scan the repositories listed in this CSV file
    #[arg(long, value_name = "CSV")]
    repo_list: Option<PathBuf>,

    /// Column of the repository list holding `owner/name` values
    #[arg(long, value_name = "NAME", requires = "repo_list")]
    repo_column: Option<String>,

    /// Path of the CSV export
    #[arg(short, long, value_name = "CSV")]
    output: Option<PathBuf>,

    /// Also write a markdown run report here
    #[arg(long, value_name = "MD")]
    summary: Option<PathBuf>,

    /// API base URL, e.g. https://ghe.example.com/api/v3
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Number of repositories walked at once
    #[arg(long, value_name = "N")]
    concurrency: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path).with_context(|| {
                format!("Failed to load configuration from {}", path.display())
            })?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, Some(hash))
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            (Config::default(), None)
        }
    };

    apply_overrides(&mut config, &cli);

    // The token must be present before anything touches the network
    let credential = resolve_credential(&config.api.token_env)?;
    let resolved = resolve_config(config, config_hash, credential)?;

    if cli.dry_run {
        handle_dry_run(&resolved);
        return Ok(());
    }

    handle_crawl(resolved).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("bfile_scout=info,warn"),
            1 => EnvFilter::new("bfile_scout=debug,info"),
            2 => EnvFilter::new("bfile_scout=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Applies command-line overrides on top of the loaded configuration
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(org) = &cli.org {
        config.source = Some(SourceConfig::Org { org: org.clone() });
    }

    if let Some(path) = &cli.repo_list {
        let column = match (&cli.repo_column, &config.source) {
            (Some(column), _) => column.clone(),
            (None, Some(SourceConfig::List { column, .. })) => column.clone(),
            (None, _) => "repo".to_string(),
        };
        config.source = Some(SourceConfig::List {
            path: path.clone(),
            column,
        });
    }

    if let Some(output) = &cli.output {
        config.output.csv_path = output.clone();
    }
    if let Some(summary) = &cli.summary {
        config.output.summary_path = Some(summary.clone());
    }
    if let Some(base_url) = &cli.base_url {
        config.api.base_url = base_url.clone();
    }
    if let Some(concurrency) = cli.concurrency {
        config.crawler.max_concurrent_repos = concurrency;
    }
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(resolved: &ResolvedConfig) {
    let config = &resolved.config;

    println!("=== bfile-scout Dry Run ===\n");

    println!("API:");
    println!("  Base URL: {}", config.api.base_url);
    println!("  Token variable: {} (set)", config.api.token_env);
    println!("  User agent: {}", config.api.user_agent);
    println!(
        "  Timeouts: {}s request, {}s connect",
        config.api.request_timeout_secs, config.api.connect_timeout_secs
    );

    println!("\nCrawler:");
    println!("  Candidate file: {}", config.crawler.candidate_filename);
    println!(
        "  Max concurrent repositories: {}",
        config.crawler.max_concurrent_repos
    );
    println!(
        "  Retries: {} (backoff {}ms to {}ms)",
        config.crawler.max_retries, config.crawler.backoff_base_ms, config.crawler.backoff_max_ms
    );
    match config.crawler.repo_timeout_secs {
        Some(secs) => println!("  Repository timeout: {}s", secs),
        None => println!("  Repository timeout: none"),
    }

    println!("\nSource:");
    println!("  {}", bfile_scout::source::describe(&resolved.source));

    println!("\nOutput:");
    println!("  CSV: {}", config.output.csv_path.display());
    println!("  UTF-8 BOM: {}", config.output.utf8_bom);
    if let Some(summary) = &config.output.summary_path {
        println!("  Summary: {}", summary.display());
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(resolved: ResolvedConfig) -> anyhow::Result<()> {
    let cancel = CancelSignal::new();

    let signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight requests");
            signal.cancel();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::error!("Second interrupt, exiting without writing the export");
            std::process::exit(130);
        }
    });

    let report = match crawl(&resolved, cancel).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e).context("Crawl failed");
        }
    };

    print_statistics(&report.summary);

    if report.summary.was_cancelled() {
        tracing::warn!(
            "Run was cancelled; {} holds a partial export",
            resolved.config.output.csv_path.display()
        );
    } else {
        tracing::info!("Crawl completed successfully");
    }

    Ok(())
}
