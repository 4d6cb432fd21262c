//! SQLite run history store
//!
//! This module provides a SQLite-based implementation of the RunStore trait.

use crate::output::{ErrorCounts, SessionReport};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RunStore, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, Row};
use std::path::Path;

/// SQLite run history backend
pub struct SqliteRunStore {
    conn: Connection,
}

impl SqliteRunStore {
    /// Opens or creates the run history database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteRunStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SessionReport> {
    Ok(SessionReport {
        site: row.get(0)?,
        pages_visited: row.get(1)?,
        identifiers_found: row.get(2)?,
        accepted: row.get(3)?,
        already_known: row.get(4)?,
        filtered: row.get(5)?,
        policy_denied: row.get(6)?,
        errors: ErrorCounts {
            timeout: row.get(7)?,
            connection: row.get(8)?,
            http_status: row.get(9)?,
            non_html: row.get(10)?,
        },
        sink_failures: row.get(11)?,
        robots_unavailable: row.get(12)?,
        interrupted: row.get(13)?,
        elapsed_ms: row.get(14)?,
    })
}

impl RunStore for SqliteRunStore {
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn record_session(&mut self, run_id: i64, report: &SessionReport) -> StorageResult<()> {
        let changed = self.conn.execute(
            "INSERT INTO sessions (
                run_id, site, pages_visited, identifiers_found, accepted, already_known,
                filtered, policy_denied, timeouts, connection_errors, http_errors, non_html,
                sink_failures, robots_unavailable, interrupted, elapsed_ms
            ) SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16
              WHERE EXISTS (SELECT 1 FROM runs WHERE id = ?1)",
            params![
                run_id,
                report.site,
                report.pages_visited,
                report.identifiers_found,
                report.accepted,
                report.already_known,
                report.filtered,
                report.policy_denied,
                report.errors.timeout,
                report.errors.connection,
                report.errors.http_status,
                report.errors.non_html,
                report.sink_failures,
                report.robots_unavailable,
                report.interrupted,
                report.elapsed_ms,
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;

        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
        )?;

        stmt.query_row(params![run_id], run_from_row)
            .map_err(|_| StorageError::RunNotFound(run_id))
    }

    fn recent_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status
             FROM runs ORDER BY id DESC LIMIT ?1",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let runs = stmt
            .query_map(params![limit], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }

    fn sessions_for_run(&self, run_id: i64) -> StorageResult<Vec<SessionReport>> {
        let mut stmt = self.conn.prepare(
            "SELECT site, pages_visited, identifiers_found, accepted, already_known,
                    filtered, policy_denied, timeouts, connection_errors, http_errors,
                    non_html, sink_failures, robots_unavailable, interrupted, elapsed_ms
             FROM sessions WHERE run_id = ?1 ORDER BY id",
        )?;

        let sessions = stmt
            .query_map(params![run_id], session_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn report(site: &str, accepted: u64) -> SessionReport {
        SessionReport {
            site: site.to_string(),
            pages_visited: 12,
            identifiers_found: 7,
            accepted,
            already_known: 2,
            filtered: 1,
            policy_denied: 3,
            errors: ErrorCounts {
                timeout: 1,
                connection: 0,
                http_status: 2,
                non_html: 4,
            },
            sink_failures: 0,
            robots_unavailable: true,
            interrupted: false,
            elapsed_ms: 1500,
        }
    }

    #[test]
    fn test_create_and_finish_run() {
        let mut store = SqliteRunStore::new_in_memory().unwrap();
        let run_id = store.create_run("abc123").unwrap();

        let run = store.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.config_hash, "abc123");
        assert!(run.finished_at.is_none());

        store.finish_run(run_id, RunStatus::Interrupted).unwrap();
        let run = store.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Interrupted);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_sessions_round_trip() {
        let mut store = SqliteRunStore::new_in_memory().unwrap();
        let run_id = store.create_run("hash").unwrap();

        store.record_session(run_id, &report("https://a.test/", 4)).unwrap();
        store.record_session(run_id, &report("https://b.test/", 0)).unwrap();

        let sessions = store.sessions_for_run(run_id).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0], report("https://a.test/", 4));
        assert_eq!(sessions[1].site, "https://b.test/");
    }

    #[test]
    fn test_record_session_unknown_run() {
        let mut store = SqliteRunStore::new_in_memory().unwrap();
        assert!(matches!(
            store.record_session(99, &report("https://a.test/", 1)),
            Err(StorageError::RunNotFound(99))
        ));
        assert!(matches!(
            store.finish_run(99, RunStatus::Completed),
            Err(StorageError::RunNotFound(99))
        ));
    }

    #[test]
    fn test_recent_runs_newest_first() {
        let mut store = SqliteRunStore::new_in_memory().unwrap();
        let first = store.create_run("one").unwrap();
        let second = store.create_run("two").unwrap();
        let third = store.create_run("three").unwrap();

        let runs = store.recent_runs(2).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, third);
        assert_eq!(runs[1].id, second);
        assert!(runs.iter().all(|r| r.id != first));
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("runs.db");

        let run_id = {
            let mut store = SqliteRunStore::new(&path).unwrap();
            let id = store.create_run("hash").unwrap();
            store.finish_run(id, RunStatus::Completed).unwrap();
            id
        };

        let store = SqliteRunStore::new(&path).unwrap();
        assert_eq!(store.get_run(run_id).unwrap().status, RunStatus::Completed);
    }
}
