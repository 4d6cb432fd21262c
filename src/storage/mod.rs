//! Storage module for persisting crawl data
//!
//! This module handles everything that outlives a single run:
//! - The fingerprint history log read at startup and appended on acceptance
//! - The SQLite run history (runs and their per-site session reports)

mod history;
mod schema;
mod sqlite;
mod traits;

pub use history::{FileFingerprintLog, MemoryFingerprintLog};
pub use sqlite::SqliteRunStore;
pub use traits::{FingerprintLog, RunStore, StorageError, StorageResult};

use std::path::Path;

/// Opens or creates the run history database
pub fn open_run_store(path: &Path) -> StorageResult<SqliteRunStore> {
    SqliteRunStore::new(path)
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
