//! Markdown summary generation
//!
//! This module generates a human-readable markdown report of a crawl run,
//! including totals, repository outcomes and every recorded diagnostic.

use crate::output::traits::{CrawlSummary, OutputResult};
use crate::state::RepoState;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Generates a markdown summary from crawl statistics
///
/// # Arguments
///
/// * `summary` - The crawl summary data
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(summary: &CrawlSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    tracing::info!("Wrote run report to {}", output_path.display());
    Ok(())
}

/// Formats a crawl summary as markdown
pub fn format_markdown_summary(summary: &CrawlSummary) -> String {
    let mut md = String::new();

    md.push_str("# bfile-scout Run Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", summary.started_at));
    if let Some(finished) = &summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished));
    }
    if let Some(duration) = summary.duration_seconds {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            duration,
            duration as f64 / 60.0
        ));
    }
    md.push_str(&format!("- **Status**: {}\n", summary.status));
    md.push_str(&format!(
        "- **Candidate File**: `{}`\n",
        summary.candidate_filename
    ));
    if let Some(hash) = &summary.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!(
        "- **Repositories**: {}\n",
        summary.total_repositories
    ));
    md.push_str(&format!("- **Rows Exported**: {}\n", summary.rows_exported));
    md.push_str(&format!(
        "- **Repository Failures**: {}\n",
        summary.repository_failures()
    ));
    md.push_str(&format!("- **File Failures**: {}\n", summary.file_failures()));
    md.push_str(&format!("- **API Requests**: {}\n", summary.api_requests));
    md.push_str(&format!(
        "- **Rate Limit Hits**: {}\n",
        summary.rate_limit_hits
    ));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        summary.success_rate()
    ));

    // State breakdown
    md.push_str("## Repository State Breakdown\n\n");
    md.push_str("| State | Count |\n");
    md.push_str("|-------|-------|\n");
    for state in RepoState::terminal_states() {
        md.push_str(&format!("| {} | {} |\n", state, summary.count(state)));
    }
    md.push('\n');

    // Diagnostics
    if !summary.diagnostics.is_empty() {
        md.push_str("## Diagnostics\n\n");
        md.push_str("| Repository | Path | Kind | Message |\n");
        md.push_str("|------------|------|------|---------|\n");

        let mut diagnostics: Vec<_> = summary.diagnostics.iter().collect();
        diagnostics.sort_by(|a, b| {
            a.repository
                .cmp(&b.repository)
                .then_with(|| a.path.cmp(&b.path))
        });

        for diagnostic in diagnostics {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                diagnostic.repository,
                escape_cell(diagnostic.path.as_deref().unwrap_or("-")),
                diagnostic.kind,
                escape_cell(&diagnostic.message)
            ));
        }
        md.push('\n');
    }

    md
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
