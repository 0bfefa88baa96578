//! Logging service - structured event logging to DuckDB
//!
//! Provides a privacy-safe event log stored in logs.duckdb. No account data
//! (balances, amounts, passwords, tokens, usernames) is ever logged.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use chrono::Utc;
use duckdb::Connection;
use serde::{Deserialize, Serialize};

use crate::log_migrations::LOG_MIGRATIONS;
use crate::services::migration::MigrationService;

/// Counter for generating unique IDs within the same millisecond
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a unique ID based on timestamp + counter
fn generate_id() -> u64 {
    let timestamp = now_ms().max(0) as u64;

    // Lower 16 bits for the counter, the rest for the timestamp
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
    (timestamp << 16) | counter
}

/// Current unix timestamp in milliseconds
fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn detect_platform() -> &'static str {
    if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else {
        "unknown"
    }
}

/// How the application was invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    /// One-shot `bb <command>`
    Cli,
    /// Interactive `bb shell` menu
    Shell,
}

impl EntryPoint {
    fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::Cli => "cli",
            EntryPoint::Shell => "shell",
        }
    }
}

/// A log event to be recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl LogEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            command: None,
            error_code: None,
            error_message: None,
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Attach a failure by its stable error code (e.g. `insufficient_funds`)
    ///
    /// The stored message is the fixed summary for that code, never the
    /// error's own text, which can carry usernames or paths.
    pub fn with_error(mut self, code: &str) -> Self {
        self.error_message = Some(failure_summary(code).to_string());
        self.error_code = Some(code.to_string());
        self
    }
}

/// Fixed, account-free description of an error code
pub fn failure_summary(code: &str) -> &'static str {
    match code {
        "invalid_input" => "Invalid input",
        "invalid_session" => "Invalid or expired session",
        "invalid_credentials" => "Invalid username or password",
        "insufficient_funds" => "Insufficient balance",
        "unknown_recipient" => "Unknown recipient",
        "username_taken" => "Username already taken",
        "store_unavailable" => "Store unavailable",
        "config" => "Configuration error",
        "serialization" => "Serialization error",
        _ => "Command failed",
    }
}

/// A log entry as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: i64,
    pub entry_point: String,
    pub app_version: String,
    pub platform: String,
    pub event: String,
    pub command: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

/// Which entries `LoggingService::query` returns
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub failures_only: bool,
    pub command: Option<String>,
    pub error_code: Option<String>,
}

/// Per-command totals from the event log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandStats {
    pub command: String,
    pub runs: u64,
    pub failures: u64,
}

const ENTRY_COLUMNS: &str = "id, timestamp, entry_point, app_version, platform, \
                             event, command, error_code, error_message";

/// Service for structured event logging
///
/// Manages logs.duckdb and provides methods for recording events and
/// querying the log history.
pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    entry_point: EntryPoint,
    app_version: String,
    platform: &'static str,
}

impl LoggingService {
    /// Open or create logs.duckdb in the data directory and migrate it
    pub fn new(
        data_dir: &Path,
        entry_point: EntryPoint,
        app_version: impl Into<String>,
    ) -> Result<Self> {
        let db_path = data_dir.join("logs.duckdb");
        let conn = Connection::open(&db_path)?;

        MigrationService::with_migrations(&conn, LOG_MIGRATIONS).run_pending()?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            entry_point,
            app_version: app_version.into(),
            platform: detect_platform(),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    /// Record an event
    ///
    /// Entry point, app version and platform are filled in from the service.
    pub fn log(&self, event: LogEvent) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            &format!(
                "INSERT INTO sys_logs ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                ENTRY_COLUMNS
            ),
            duckdb::params![
                generate_id(),
                now_ms(),
                self.entry_point.as_str(),
                &self.app_version,
                self.platform,
                &event.event,
                &event.command,
                &event.error_code,
                &event.error_message,
            ],
        )?;

        Ok(())
    }

    /// Log a command execution
    pub fn log_command(&self, command: &str) -> Result<()> {
        self.log(LogEvent::new("command_executed").with_command(command))
    }

    /// Log a failed command as `<command>_failed`
    pub fn log_failure(&self, command: &str, code: &str) -> Result<()> {
        self.log(
            LogEvent::new(format!("{}_failed", command))
                .with_command(command)
                .with_error(code),
        )
    }

    /// Entries matching `filter`, most recent first
    pub fn query(&self, filter: &LogFilter, limit: usize) -> Result<Vec<LogEntry>> {
        let mut sql = format!("SELECT {} FROM sys_logs WHERE 1 = 1", ENTRY_COLUMNS);
        let mut values: Vec<String> = Vec::new();

        if filter.failures_only {
            sql.push_str(" AND error_code IS NOT NULL");
        }
        if let Some(command) = &filter.command {
            sql.push_str(" AND command = ?");
            values.push(command.clone());
        }
        if let Some(code) = &filter.error_code {
            sql.push_str(" AND error_code = ?");
            values.push(code.clone());
        }
        sql.push_str(&format!(" ORDER BY timestamp DESC, id DESC LIMIT {}", limit));

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(duckdb::params_from_iter(values.iter()), |row| {
                Ok(LogEntry {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    entry_point: row.get(2)?,
                    app_version: row.get(3)?,
                    platform: row.get(4)?,
                    event: row.get(5)?,
                    command: row.get(6)?,
                    error_code: row.get(7)?,
                    error_message: row.get(8)?,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;

        Ok(entries)
    }

    /// Runs and failures per command, busiest first
    pub fn command_stats(&self) -> Result<Vec<CommandStats>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT command, COUNT(*), COUNT(error_code)
             FROM sys_logs
             WHERE command IS NOT NULL
             GROUP BY command
             ORDER BY COUNT(*) DESC, command",
        )?;
        let stats = stmt
            .query_map([], |row| {
                Ok(CommandStats {
                    command: row.get(0)?,
                    runs: row.get::<_, i64>(1)? as u64,
                    failures: row.get::<_, i64>(2)? as u64,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(stats)
    }

    /// Failure count per error code, most frequent first
    pub fn failures_by_code(&self) -> Result<Vec<(String, u64)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT error_code, COUNT(*)
             FROM sys_logs
             WHERE error_code IS NOT NULL
             GROUP BY error_code
             ORDER BY COUNT(*) DESC, error_code",
        )?;
        let counts = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(counts)
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sys_logs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn error_count(&self) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sys_logs WHERE error_code IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Delete logs older than the given unix ms timestamp
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM sys_logs WHERE timestamp < ?", [timestamp_ms])?;
        Ok(deleted as u64)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}
