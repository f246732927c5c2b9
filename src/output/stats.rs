//! Run statistics printed at the end of a crawl

use crate::output::traits::CrawlSummary;
use crate::state::RepoState;

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `summary` - The summary of the finished run
pub fn print_statistics(summary: &CrawlSummary) {
    print!("{}", format_statistics(summary));
}

/// Renders the statistics block printed by [`print_statistics`]
pub fn format_statistics(summary: &CrawlSummary) -> String {
    let mut out = String::new();

    out.push_str("=== Crawl Statistics ===\n\n");

    out.push_str("Overview:\n");
    out.push_str(&format!("  Repositories: {}\n", summary.total_repositories));
    out.push_str(&format!("  Rows exported: {}\n", summary.rows_exported));
    out.push_str(&format!(
        "  API requests: {} ({} rate limited)\n",
        summary.api_requests, summary.rate_limit_hits
    ));
    out.push('\n');

    out.push_str("Repositories by State:\n");
    let total = summary.total_repositories;
    for state in RepoState::terminal_states() {
        let count = summary.count(state);
        if count == 0 {
            continue;
        }
        let percentage = if total > 0 {
            (count as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        out.push_str(&format!("  {}: {} ({:.1}%)\n", state, count, percentage));
    }
    out.push('\n');

    if !summary.diagnostics.is_empty() {
        out.push_str(&format!(
            "Diagnostics ({}: {} repository, {} file):\n",
            summary.diagnostics.len(),
            summary.repository_failures(),
            summary.file_failures()
        ));
        for diagnostic in &summary.diagnostics {
            out.push_str(&format!("  - {}\n", diagnostic));
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "Success Rate: {:.1}% ({} / {} repositories fully walked)\n",
        summary.success_rate(),
        summary.count(RepoState::Completed),
        summary.total_terminal_repositories()
    ));

    out
}
