//! Event log - what the import pipeline did, kept in logs.duckdb
//!
//! Statement content never reaches this log: no descriptions, values, dates
//! or category ids. An entry holds the event name, the command and storage
//! backend involved, row counts of an import and coarse error text.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use chrono::Utc;
use duckdb::Connection;
use serde::{Deserialize, Serialize};

use crate::domain::result::ImportResult;
use crate::log_migrations::LOG_MIGRATIONS;
use crate::services::migration::MigrationService;

pub const LOG_FILE: &str = "logs.duckdb";

/// Current unix timestamp in milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Which front end produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    Cli,
}

impl EntryPoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::Cli => "cli",
        }
    }
}

/// Something worth recording, built up before handing it to [`LoggingService::log`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_imported: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_failed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl LogEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            ..Self::default()
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Storage backend name ("api", "local", "memory")
    pub fn with_storage(mut self, storage: impl Into<String>) -> Self {
        self.storage = Some(storage.into());
        self
    }

    /// Row counts of an import
    ///
    /// Row error strings quote statement content, so only their number is kept.
    pub fn with_outcome(mut self, result: &ImportResult) -> Self {
        self.rows_imported = Some(result.total_imported as u32);
        self.rows_failed = Some(result.errors.len() as u32);
        if !result.success && self.error_message.is_none() {
            self.error_message = Some("import did not complete".to_string());
        }
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_error_details(mut self, details: impl Into<String>) -> Self {
        self.error_details = Some(details.into());
        self
    }
}

/// A stored event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: i64,
    pub entry_point: String,
    pub app_version: String,
    pub platform: String,
    pub event: String,
    pub command: Option<String>,
    pub storage: Option<String>,
    pub rows_imported: Option<u32>,
    pub rows_failed: Option<u32>,
    pub error_message: Option<String>,
    pub error_details: Option<String>,
}

/// Which entries [`LoggingService::query`] returns, newest first
#[derive(Debug, Clone)]
pub struct LogFilter {
    pub limit: usize,
    pub errors_only: bool,
    pub event: Option<String>,
}

impl Default for LogFilter {
    fn default() -> Self {
        Self {
            limit: 50,
            errors_only: false,
            event: None,
        }
    }
}

/// Aggregate view of the log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogStats {
    pub total_entries: u64,
    pub error_count: u64,
    /// Sum over all logged imports
    pub rows_imported: u64,
    pub rows_failed: u64,
    /// Entries per event name, most frequent first
    pub events: Vec<(String, u64)>,
}

const SELECT_ENTRY: &str = "SELECT id, timestamp, entry_point, app_version, platform, event, \
                            command, storage, rows_imported, rows_failed, error_message, \
                            error_details FROM sys_logs";

fn row_to_entry(row: &duckdb::Row) -> duckdb::Result<LogEntry> {
    Ok(LogEntry {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        entry_point: row.get(2)?,
        app_version: row.get(3)?,
        platform: row.get(4)?,
        event: row.get(5)?,
        command: row.get(6)?,
        storage: row.get(7)?,
        rows_imported: row.get(8)?,
        rows_failed: row.get(9)?,
        error_message: row.get(10)?,
        error_details: row.get(11)?,
    })
}

pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    entry_point: EntryPoint,
    app_version: String,
}

impl LoggingService {
    /// Open or create the log database in `data_dir` and apply log migrations
    pub fn new(
        data_dir: &Path,
        entry_point: EntryPoint,
        app_version: impl Into<String>,
    ) -> Result<Self> {
        let db_path = data_dir.join(LOG_FILE);
        let conn = Connection::open(&db_path)?;
        MigrationService::new(&conn, LOG_MIGRATIONS).run_pending()?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            entry_point,
            app_version: app_version.into(),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    /// Store an event stamped with time, entry point, version and OS
    pub fn log(&self, event: LogEvent) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO sys_logs (timestamp, entry_point, app_version, platform, event, command,
                                   storage, rows_imported, rows_failed, error_message, error_details)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            duckdb::params![
                now_ms(),
                self.entry_point.as_str(),
                &self.app_version,
                std::env::consts::OS,
                &event.event,
                &event.command,
                &event.storage,
                &event.rows_imported,
                &event.rows_failed,
                &event.error_message,
                &event.error_details,
            ],
        )?;
        Ok(())
    }

    pub fn query(&self, filter: &LogFilter) -> Result<Vec<LogEntry>> {
        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();
        if filter.errors_only {
            conditions.push("error_message IS NOT NULL");
        }
        if let Some(event) = &filter.event {
            conditions.push("event = ?");
            params.push(event.clone());
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} {} ORDER BY timestamp DESC, id DESC LIMIT {}",
            SELECT_ENTRY, where_clause, filter.limit
        ))?;
        let entries = stmt
            .query_map(duckdb::params_from_iter(params), row_to_entry)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(entries)
    }

    pub fn stats(&self) -> Result<LogStats> {
        let conn = self.conn()?;
        let (total_entries, error_count, rows_imported, rows_failed) = conn.query_row(
            "SELECT COUNT(*),
                    COUNT(error_message),
                    COALESCE(SUM(rows_imported), 0)::UBIGINT,
                    COALESCE(SUM(rows_failed), 0)::UBIGINT
             FROM sys_logs",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        let mut stmt = conn.prepare(
            "SELECT event, COUNT(*) AS n FROM sys_logs GROUP BY event ORDER BY n DESC, event",
        )?;
        let events: Vec<(String, u64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(LogStats {
            total_entries,
            error_count,
            rows_imported,
            rows_failed,
            events,
        })
    }

    /// Delete entries older than `timestamp_ms` (unix ms)
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let deleted = self
            .conn()?
            .execute("DELETE FROM sys_logs WHERE timestamp < ?", [timestamp_ms])?;
        Ok(deleted as u64)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}
