// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Error reporting for per-entry failures during a populator run.
//
// An unreadable entry never aborts a run: the populator skips it and hands
// the error to an `ErrorReporter`. The tracing reporter just logs; the SQLite
// reporter keeps an append-only record for later inspection.
//
// Schema:
//   entry_reports(
//     id        INTEGER PRIMARY KEY AUTOINCREMENT,
//     timestamp TEXT    NOT NULL,   -- RFC 3339
//     context   TEXT    NOT NULL,   -- e.g. "folder", "tree", "all-files"
//     path      TEXT,               -- entry path or URI, when known
//     message   TEXT    NOT NULL
//   )

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use folio_core::error::{FolioError, Result};

/// Receives errors that were recovered from during a run.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, context: &str, error: &FolioError);
}

/// Reporter that logs at `warn` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, context: &str, error: &FolioError) {
        warn!(%context, %error, "entry skipped");
    }
}

// ---------------------------------------------------------------------------
// SQLite reporter
// ---------------------------------------------------------------------------

fn db_err(e: rusqlite::Error) -> FolioError {
    FolioError::Database(e.to_string())
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS entry_reports (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT    NOT NULL,
    context   TEXT    NOT NULL,
    path      TEXT,
    message   TEXT    NOT NULL
);";

/// A stored report, used for queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    pub id: i64,
    pub timestamp: String,
    pub context: String,
    pub path: Option<String>,
    pub message: String,
}

/// Append-only report log backed by SQLite.
pub struct SqliteReporter {
    conn: Mutex<Connection>,
}

impl SqliteReporter {
    /// Open (or create) the report database at `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        debug!("report log opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory report database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Append a report.
    pub fn record(&self, context: &str, path: Option<&str>, message: &str) -> Result<()> {
        let timestamp = Utc::now().to_rfc3339();
        let conn = self.conn.lock().expect("report db lock poisoned");
        conn.execute(
            "INSERT INTO entry_reports (timestamp, context, path, message)
             VALUES (?1, ?2, ?3, ?4)",
            params![timestamp, context, path, message],
        )
        .map_err(db_err)?;
        Ok(())
    }

    /// Most recent `limit` reports, newest first.
    pub fn recent(&self, limit: u32) -> Result<Vec<ReportEntry>> {
        let conn = self.conn.lock().expect("report db lock poisoned");
        let mut stmt = conn
            .prepare(
                "SELECT id, timestamp, context, path, message
                 FROM entry_reports
                 ORDER BY id DESC
                 LIMIT ?1",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(ReportEntry {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    context: row.get(2)?,
                    path: row.get(3)?,
                    message: row.get(4)?,
                })
            })
            .map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(db_err)?);
        }
        Ok(entries)
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.conn.lock().expect("report db lock poisoned");
        conn.query_row("SELECT COUNT(*) FROM entry_reports", [], |row| row.get(0))
            .map_err(db_err)
    }
}

impl ErrorReporter for SqliteReporter {
    fn report(&self, context: &str, error: &FolioError) {
        let path = match error {
            FolioError::EntryAccess { path, .. } => Some(path.display().to_string()),
            _ => None,
        };
        warn!(%context, %error, "entry skipped");
        if let Err(e) = self.record(context, path.as_deref(), &error.to_string()) {
            warn!(error = %e, "failed to store entry report");
        }
    }
}
