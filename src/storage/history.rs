//! Text-file fingerprint logs

use crate::storage::traits::{FingerprintLog, StorageError, StorageResult};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const ENTRY_PREFIX: &str = "magnet:";

/// Append-only history file, one raw identifier per line
///
/// Additional read-only lists (e.g. identifiers already downloaded by hand)
/// are merged into [`FingerprintLog::load`] but never written.
pub struct FileFingerprintLog {
    path: PathBuf,
    extra: Vec<PathBuf>,
    writer: Mutex<File>,
}

impl FileFingerprintLog {
    /// Opens (creating if needed) the history file for appending
    ///
    /// # Returns
    ///
    /// * `Ok(FileFingerprintLog)` - The file is writable
    /// * `Err(StorageError::Open)` - The file cannot be created or opened
    pub fn open(path: &Path, extra: &[PathBuf]) -> StorageResult<Self> {
        let writer = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| StorageError::Open {
                path: path.display().to_string(),
                source,
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            extra: extra.to_vec(),
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Reads the magnet entries of one file; a missing file yields nothing
fn read_entries(path: &Path, entries: &mut Vec<String>) -> StorageResult<()> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    for line in BufReader::new(file).lines() {
        let line = line?;
        let line = line.trim();
        if line.starts_with(ENTRY_PREFIX) {
            entries.push(line.to_string());
        }
    }

    Ok(())
}

impl FingerprintLog for FileFingerprintLog {
    fn load(&self) -> StorageResult<Vec<String>> {
        let mut entries = Vec::new();
        read_entries(&self.path, &mut entries)?;
        for extra in &self.extra {
            read_entries(extra, &mut entries)?;
        }
        Ok(entries)
    }

    fn append(&self, raw: &str) -> StorageResult<()> {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(writer, "{}", raw)?;
        writer.flush()?;
        Ok(())
    }
}

/// In-memory fingerprint log
#[derive(Debug, Default)]
pub struct MemoryFingerprintLog {
    entries: Mutex<Vec<String>>,
}

impl MemoryFingerprintLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: Mutex::new(entries.into_iter().map(Into::into).collect()),
        }
    }

    /// Snapshot of every stored line
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl FingerprintLog for MemoryFingerprintLog {
    fn load(&self) -> StorageResult<Vec<String>> {
        Ok(self
            .entries()
            .into_iter()
            .map(|line| line.trim().to_string())
            .filter(|line| line.starts_with(ENTRY_PREFIX))
            .collect())
    }

    fn append(&self, raw: &str) -> StorageResult<()> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(raw.to_string());
        Ok(())
    }
}
