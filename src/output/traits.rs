//! Result sink trait and output errors

use crate::magnet::{Category, MagnetLink};
use crate::storage::StorageError;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Cannot open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination of accepted identifiers
///
/// Shared by every session of a run. Implementations must serialize their
/// own writes since `emit` is called from concurrent workers.
pub trait ResultSink: Send + Sync {
    /// Records one newly accepted identifier
    ///
    /// # Arguments
    ///
    /// * `link` - The accepted identifier
    /// * `category` - Its category
    fn emit(&self, link: &MagnetLink, category: &Category) -> OutputResult<()>;

    /// Completes the run's output
    ///
    /// # Returns
    ///
    /// The number of identifiers emitted per category, in category order
    fn finalize(&self) -> OutputResult<Vec<(Category, usize)>>;
}
