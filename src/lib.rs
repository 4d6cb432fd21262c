//! Lodestone: a focused magnet-link crawler
//!
//! This crate crawls a bounded list of websites, one session per site, and
//! collects the magnet URIs embedded in their pages. Identifiers already seen in
//! previous runs are recognised by their info-hash fingerprint and never emitted
//! twice. Crawling stays on the seed host, honours robots.txt and applies a
//! per-request politeness delay.

pub mod config;
pub mod crawler;
pub mod dedup;
pub mod magnet;
pub mod output;
pub mod robots;
pub mod scope;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Lodestone operations
#[derive(Debug, Error)]
pub enum LodestoneError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Seed file {path} could not be read: {source}")]
    SeedFile {
        path: String,
        source: std::io::Error,
    },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Lodestone operations
pub type Result<T> = std::result::Result<T, LodestoneError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Crawler, StopSignal};
pub use dedup::Deduplicator;
pub use magnet::{Category, Fingerprint, MagnetLink};
pub use scope::ScopeGate;
pub use crate::url::{extract_domain, normalize_url};
