//! SQLite persistence for campaign and prize configuration.
//!
//! RULE: Only store/ talks to the database.
//! Report code reads records through these methods and never runs SQL.
//! Transactions are never persisted here; they live in the in-memory table.

use crate::error::{ReportError, ReportResult};
use chrono::NaiveDate;
use rusqlite::Connection;

mod point_campaign;
mod prize;
mod store_campaign;

pub struct CampaignStore {
    conn: Connection,
    path: Option<String>, // None for :memory:
}

impl CampaignStore {
    pub fn open(path: &str) -> ReportResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // In-memory databases answer "memory" instead of switching to WAL.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        log::debug!("campaign store: opened {path}");
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> ReportResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases this returns a new, empty database.
    pub fn reopen(&self) -> ReportResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Journal mode reported by SQLite: "wal" for files, "memory" in memory.
    pub fn journal_mode(&self) -> ReportResult<String> {
        Ok(self
            .conn
            .query_row("PRAGMA journal_mode;", [], |row| row.get(0))?)
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> ReportResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_campaigns.sql"))?;
        Ok(())
    }
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn parse_date(column: &str, value: &str) -> ReportResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| ReportError::InvalidStoredValue {
        column: column.to_string(),
        value: value.to_string(),
    })
}

pub(crate) fn not_found(id: &str) -> ReportError {
    ReportError::CampaignNotFound { id: id.to_string() }
}
