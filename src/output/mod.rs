//! Output module for exports and run reports
//!
//! This module handles:
//! - Writing the CSV export of managed files
//! - Generating markdown summaries of a run
//! - Printing run statistics

mod csv_export;
mod markdown;
pub mod stats;
mod traits;

pub use csv_export::{write_export, CsvExport, EXPORT_HEADER};
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{format_statistics, print_statistics};
pub use traits::{CrawlSummary, ExportSink, OutputError, OutputResult};
