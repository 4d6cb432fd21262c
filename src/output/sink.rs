//! Result sink implementations

use crate::magnet::{Category, MagnetLink};
use crate::output::report::write_category_report;
use crate::output::traits::{OutputError, OutputResult, ResultSink};
use crate::storage::FingerprintLog;
use chrono::Local;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Writes accepted identifiers to the run's text files
///
/// - the new-links file receives this run's identifiers (truncated on open)
/// - the history log receives every accepted identifier
/// - `finalize` writes one report per non-empty category
pub struct FileSink {
    new_links: Mutex<File>,
    history: Arc<dyn FingerprintLog>,
    reports_dir: PathBuf,
    accepted: Mutex<BTreeMap<Category, Vec<String>>>,
}

impl FileSink {
    /// Opens the sink, truncating the new-links file
    ///
    /// # Arguments
    ///
    /// * `new_links_path` - File listing identifiers accepted this run
    /// * `history` - Log every accepted identifier is appended to
    /// * `reports_dir` - Directory receiving the category reports
    ///
    /// # Returns
    ///
    /// * `Ok(FileSink)` - The new-links file is open
    /// * `Err(OutputError::Open)` - It cannot be created
    pub fn create(
        new_links_path: &Path,
        history: Arc<dyn FingerprintLog>,
        reports_dir: &Path,
    ) -> OutputResult<Self> {
        let new_links = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(new_links_path)
            .map_err(|source| OutputError::Open {
                path: new_links_path.display().to_string(),
                source,
            })?;

        Ok(Self {
            new_links: Mutex::new(new_links),
            history,
            reports_dir: reports_dir.to_path_buf(),
            accepted: Mutex::new(BTreeMap::new()),
        })
    }
}

impl ResultSink for FileSink {
    fn emit(&self, link: &MagnetLink, category: &Category) -> OutputResult<()> {
        {
            let mut file = self.new_links.lock().unwrap_or_else(|e| e.into_inner());
            writeln!(file, "{}", link.raw())?;
            file.flush()?;
        }

        self.history.append(link.raw())?;

        self.accepted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(category.clone())
            .or_default()
            .push(link.raw().to_string());

        Ok(())
    }

    fn finalize(&self) -> OutputResult<Vec<(Category, usize)>> {
        let accepted = self.accepted.lock().unwrap_or_else(|e| e.into_inner());
        let generated_at = Local::now();

        if accepted.is_empty() {
            tracing::info!("No new identifiers this run, no category reports written");
        }

        let mut counts = Vec::with_capacity(accepted.len());
        for (category, links) in accepted.iter() {
            write_category_report(&self.reports_dir, category, links, generated_at)?;
            counts.push((category.clone(), links.len()));
        }

        Ok(counts)
    }
}

/// Keeps emitted identifiers in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    emitted: Mutex<Vec<(MagnetLink, Category)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every emission, in order
    pub fn emitted(&self) -> Vec<(MagnetLink, Category)> {
        self.emitted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl ResultSink for MemorySink {
    fn emit(&self, link: &MagnetLink, category: &Category) -> OutputResult<()> {
        self.emitted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((link.clone(), category.clone()));
        Ok(())
    }

    fn finalize(&self) -> OutputResult<Vec<(Category, usize)>> {
        let mut counts: BTreeMap<Category, usize> = BTreeMap::new();
        for (_, category) in self.emitted.lock().unwrap_or_else(|e| e.into_inner()).iter() {
            *counts.entry(category.clone()).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }
}
