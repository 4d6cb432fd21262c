//! Storage traits and error types
//!
//! Two persistence seams exist: the fingerprint log that survives between
//! runs and feeds the deduplicator, and the run store that keeps per-run
//! session reports for `--stats`.

use crate::output::SessionReport;
use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Cannot open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persisted record of every identifier accepted in earlier runs
///
/// Implementations must be safe to share between worker tasks; `append` is
/// called concurrently.
pub trait FingerprintLog: Send + Sync {
    /// Returns every stored entry that looks like a magnet URI
    ///
    /// Lines are trimmed; lines not starting with `magnet:` are skipped.
    /// Entries may still carry malformed fingerprints.
    fn load(&self) -> StorageResult<Vec<String>>;

    /// Appends one raw identifier
    fn append(&self, raw: &str) -> StorageResult<()>;
}

/// Trait for run history backends
pub trait RunStore {
    /// Creates a new run in the `running` state
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Stores the report of one finished site session
    fn record_session(&mut self, run_id: i64, report: &SessionReport) -> StorageResult<()>;

    /// Sets the final status and finish timestamp of a run
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent runs, newest first
    fn recent_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>>;

    /// Gets the session reports of a run in the order they were recorded
    fn sessions_for_run(&self, run_id: i64) -> StorageResult<Vec<SessionReport>>;
}
