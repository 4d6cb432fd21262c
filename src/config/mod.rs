//! Configuration module for Lodestone
//!
//! This module handles loading, parsing, and validating the TOML configuration
//! file, and reading the seed site list.
//!
//! # Example
//!
//! ```no_run
//! use lodestone::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("lodestone.toml")).unwrap();
//! println!("Workers per site: {}", config.crawler.workers);
//! ```

mod parser;
mod seeds;
mod types;
mod validation;

// Re-export types
pub use types::{
    default_categories, CategoryRule, Config, CrawlerConfig, FilterConfig, OutputConfig,
    ScopeConfig, UserAgentConfig, DEFAULT_DENIED_EXTENSIONS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use seeds::{load_seed_sites, parse_seed_sites, write_example_seed_file};
