//! Cross-run identifier deduplication
//!
//! The [`Deduplicator`] owns the set of known fingerprints: everything in the
//! persisted history plus everything accepted during this run. The set only
//! grows. Checking and inserting happen under one lock, so among concurrent
//! callers offering the same fingerprint exactly one is told it is new.

use crate::magnet::{Fingerprint, MagnetLink};
use crate::storage::{FingerprintLog, StorageResult};
use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct Deduplicator {
    known: Mutex<HashSet<Fingerprint>>,
}

impl Deduplicator {
    /// Creates an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the index from a persisted fingerprint log
    ///
    /// History entries whose fingerprint cannot be parsed are skipped.
    ///
    /// # Returns
    ///
    /// * `Ok(Deduplicator)` - Index holding every valid fingerprint of the log
    /// * `Err(StorageError)` - The log could not be read
    pub fn from_history(log: &dyn FingerprintLog) -> StorageResult<Self> {
        let entries = log.load()?;
        let total = entries.len();

        let known: HashSet<Fingerprint> = entries
            .iter()
            .filter_map(|raw| MagnetLink::parse(raw).ok())
            .map(|link| link.fingerprint().clone())
            .collect();

        tracing::info!(
            "{} known identifiers loaded from history ({} entries)",
            known.len(),
            total
        );

        Ok(Self {
            known: Mutex::new(known),
        })
    }

    /// Returns true if the identifier's fingerprint is not yet known
    pub fn is_new(&self, link: &MagnetLink) -> bool {
        !self.lock().contains(link.fingerprint())
    }

    /// Records the identifier's fingerprint
    ///
    /// # Returns
    ///
    /// * `true` - The fingerprint was unknown and is now recorded
    /// * `false` - The fingerprint was already known
    pub fn accept(&self, link: &MagnetLink) -> bool {
        self.lock().insert(link.fingerprint().clone())
    }

    /// Number of known fingerprints
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<Fingerprint>> {
        self.known.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryFingerprintLog;
    use std::sync::Arc;

    const F1: &str = "0123456789abcdef0123456789abcdef01234567";

    fn link(hash: &str, name: &str) -> MagnetLink {
        MagnetLink::parse(&format!("magnet:?xt=urn:btih:{}&dn={}", hash, name)).unwrap()
    }

    #[test]
    fn test_accept_once() {
        let dedup = Deduplicator::new();
        let first = link(F1, "A");

        assert!(dedup.is_new(&first));
        assert!(dedup.accept(&first));
        assert!(!dedup.is_new(&first));
        assert!(!dedup.accept(&first));
        assert_eq!(dedup.len(), 1);
    }

    #[test]
    fn test_case_insensitive_fingerprint() {
        let dedup = Deduplicator::new();
        assert!(dedup.accept(&link(F1, "lower")));
        assert!(!dedup.accept(&link(&F1.to_uppercase(), "upper")));
    }

    #[test]
    fn test_from_history() {
        let log = MemoryFingerprintLog::with_entries([
            format!("magnet:?xt=urn:btih:{}", F1.to_uppercase()),
            "magnet:?xt=urn:btih:tooshort".to_string(),
            "not a magnet".to_string(),
        ]);
        let dedup = Deduplicator::from_history(&log).unwrap();

        assert_eq!(dedup.len(), 1);
        assert!(!dedup.is_new(&link(F1, "again")));
    }

    #[test]
    fn test_concurrent_accept_single_winner() {
        let dedup = Arc::new(Deduplicator::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let dedup = Arc::clone(&dedup);
                std::thread::spawn(move || {
                    let hash = if i % 2 == 0 {
                        F1.to_string()
                    } else {
                        F1.to_uppercase()
                    };
                    dedup.accept(&link(&hash, &format!("copy{}", i)))
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(dedup.len(), 1);
    }
}
