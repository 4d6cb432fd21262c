//! Crawler module for page fetching and identifier collection
//!
//! This module contains the core crawling logic, including:
//! - The per-session frontier and its in-flight bookkeeping
//! - HTTP fetching with a politeness delay and error classification
//! - HTML parsing and link extraction
//! - The per-session worker pool
//! - Run coordination over the seed list

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod scheduler;
mod signal;

pub use coordinator::Crawler;
pub use fetcher::{build_http_client, fetch_page, is_html_content_type, FetchError, Fetcher, Page};
pub use frontier::Frontier;
pub use parser::{parse_page, ParsedPage};
pub use scheduler::{CrawlSession, Pipeline};
pub use signal::StopSignal;
