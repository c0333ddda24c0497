//! Persistent storage for charging sessions.
//!
//! Uses SQLite with WAL mode so `trickle history` can read while a
//! monitor is writing.

use std::path::PathBuf;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use trickle_core::{Session, SessionStore, StoreError};
use uuid::Uuid;

use crate::config::data_dir;

const CURRENT_SCHEMA_VERSION: i32 = 1;
const DATABASE_NAME: &str = "sessions.db";

/// Errors that can occur during session storage operations
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid stored session {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

pub type Result<T> = std::result::Result<T, SessionStoreError>;

/// Session storage backed by SQLite
pub struct SqliteSessionStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteSessionStore {
    /// Open or create the session database
    pub fn open() -> Result<Self> {
        let dir = data_dir();
        std::fs::create_dir_all(&dir)?;

        let path = dir.join(DATABASE_NAME);
        let conn = Connection::open(&path)?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA busy_timeout=5000;",
        )?;

        Self::with_connection(conn, path)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, PathBuf::from(":memory:"))
    }

    fn with_connection(conn: Connection, path: PathBuf) -> Result<Self> {
        let mut store = Self { conn, path };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn initialize_schema(&mut self) -> Result<()> {
        if self.get_schema_version()? == 0 {
            self.create_initial_schema()?;
        }
        Ok(())
    }

    /// Get the current schema version (0 if not initialized)
    fn get_schema_version(&self) -> Result<i32> {
        let exists: bool = self.conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )?;

        if !exists {
            return Ok(0);
        }

        let version: i32 = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?
            .unwrap_or(0);

        Ok(version)
    }

    fn create_initial_schema(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;

        tx.execute_batch(
            r#"
            CREATE TABLE schema_version (
                version INTEGER NOT NULL
            );

            -- One row per charging session, rewritten on every annotation
            CREATE TABLE sessions (
                id TEXT PRIMARY KEY,
                start_time INTEGER NOT NULL,
                end_time INTEGER,
                average_watts REAL NOT NULL DEFAULT 0.0,
                peak_watts REAL NOT NULL DEFAULT 0.0,
                delta_percent REAL NOT NULL DEFAULT 0.0,
                charger_label TEXT,
                notes TEXT
            );

            CREATE INDEX idx_sessions_start ON sessions(start_time);
            "#,
        )?;

        tx.execute(
            "INSERT INTO schema_version (version) VALUES (?)",
            [CURRENT_SCHEMA_VERSION],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Insert or replace a session by id. Timestamps are stored as epoch millis.
    pub fn upsert_session(&self, session: &Session) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sessions (id, start_time, end_time, average_watts, peak_watts, delta_percent, charger_label, notes)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                start_time = excluded.start_time,
                end_time = excluded.end_time,
                average_watts = excluded.average_watts,
                peak_watts = excluded.peak_watts,
                delta_percent = excluded.delta_percent,
                charger_label = excluded.charger_label,
                notes = excluded.notes",
            params![
                session.id.to_string(),
                session.start_time.timestamp_millis(),
                session.end_time.map(|t| t.timestamp_millis()),
                session.average_watts,
                session.peak_watts,
                session.delta_percent,
                session.charger_label,
                session.notes,
            ],
        )?;
        Ok(())
    }

    /// Most recent sessions first.
    pub fn list_sessions(&self, limit: usize) -> Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, start_time, end_time, average_watts, peak_watts, delta_percent, charger_label, notes
             FROM sessions ORDER BY start_time DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit as i64], StoredRow::from_row)?;
        rows.map(|row| row?.into_session()).collect()
    }

    /// Sessions that were never finalized, e.g. because the process was killed.
    pub fn get_incomplete_sessions(&self) -> Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, start_time, end_time, average_watts, peak_watts, delta_percent, charger_label, notes
             FROM sessions WHERE end_time IS NULL ORDER BY start_time",
        )?;

        let rows = stmt.query_map([], StoredRow::from_row)?;
        rows.map(|row| row?.into_session()).collect()
    }

    pub fn delete_all(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM sessions", [])?)
    }

    pub fn count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?)
    }
}

impl SessionStore for SqliteSessionStore {
    fn save_session(&mut self, session: &Session) -> std::result::Result<(), StoreError> {
        self.upsert_session(session)
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn annotate_session(&mut self, session: &Session) -> std::result::Result<(), StoreError> {
        self.upsert_session(session)
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

struct StoredRow {
    id: String,
    start_time: i64,
    end_time: Option<i64>,
    average_watts: f64,
    peak_watts: f64,
    delta_percent: f64,
    charger_label: Option<String>,
    notes: Option<String>,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            start_time: row.get(1)?,
            end_time: row.get(2)?,
            average_watts: row.get(3)?,
            peak_watts: row.get(4)?,
            delta_percent: row.get(5)?,
            charger_label: row.get(6)?,
            notes: row.get(7)?,
        })
    }

    fn into_session(self) -> Result<Session> {
        let corrupt = |reason: &str| SessionStoreError::Corrupt {
            id: self.id.clone(),
            reason: reason.to_string(),
        };

        let id = Uuid::parse_str(&self.id).map_err(|_| corrupt("bad id"))?;
        let start_time = millis_to_utc(self.start_time).ok_or_else(|| corrupt("bad start_time"))?;
        let end_time = match self.end_time {
            Some(ms) => Some(millis_to_utc(ms).ok_or_else(|| corrupt("bad end_time"))?),
            None => None,
        };

        Ok(Session {
            id,
            start_time,
            end_time,
            average_watts: self.average_watts,
            peak_watts: self.peak_watts,
            delta_percent: self.delta_percent,
            charger_label: self.charger_label,
            notes: self.notes,
        })
    }
}

fn millis_to_utc(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}
