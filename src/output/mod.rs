//! Output module for crawl results and summaries
//!
//! This module handles:
//! - Emitting accepted identifiers through a [`ResultSink`]
//! - Writing per-category report files
//! - Session reports, run summaries and their console/markdown rendering

mod markdown;
mod report;
mod sink;
pub mod stats;
mod traits;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use report::{category_report_name, format_category_report, write_category_report};
pub use sink::{FileSink, MemorySink};
pub use stats::{print_run_history, print_summary, CrawlSummary, ErrorCounts, SessionReport};
pub use traits::{OutputError, OutputResult, ResultSink};
