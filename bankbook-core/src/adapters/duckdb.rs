//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::types::Type;
use duckdb::{params, params_from_iter, Connection};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{
    Account, AccountType, Amount, ServiceKind, ServiceRequest, SessionToken, Transaction,
    TransactionFilter, TransactionKind,
};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of attempts when the database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const ACCOUNT_COLUMNS: &str = "account_id, name, username, password_hash, account_type,
    balance::VARCHAR, session_token, created_at::VARCHAR, updated_at::VARCHAR";

const TRANSACTION_COLUMNS: &str = "transaction_id, username, transaction_type,
    amount::VARCHAR, counterparty, posted_at::VARCHAR";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock on file")
}

/// DuckDB repository implementation
///
/// One connection behind a mutex: every call is serialized, and each
/// logical write runs inside [`DuckDbRepository::unit_of_work`].
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbRepository {
    /// Open (or create) the database file
    ///
    /// Retries with exponential backoff while another process holds the
    /// file lock.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut attempt = 0;
        loop {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    attempt += 1;
                    if !is_retryable_error(&err_msg) || attempt >= MAX_RETRIES {
                        return Err(e.into());
                    }
                    let delay =
                        Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt - 1));
                    tracing::warn!(
                        attempt,
                        max_attempts = MAX_RETRIES,
                        delay_ms = delay.as_millis() as u64,
                        error = %err_msg,
                        "database busy, retrying"
                    );
                    thread::sleep(delay);
                }
            }
        }
    }

    /// In-memory database, used by tests and throwaway sessions
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> duckdb::Result<Connection> {
        // Disable extension autoloading; nothing here needs extensions
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Connection::open_with_flags(db_path, config)
    }

    /// Path of the backing file, `None` for in-memory databases
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::store(format!("Lock poisoned: {}", e)))
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        let result = self.run_migrations()?;
        if !result.applied.is_empty() {
            tracing::debug!(applied = ?result.applied, "schema upgraded");
        }
        Ok(())
    }

    /// Run `work` inside one database transaction
    ///
    /// Commits when `work` returns `Ok`, rolls back otherwise, so a failed
    /// operation leaves no visible change.
    pub fn unit_of_work<T>(&self, work: impl FnOnce(&UnitOfWork<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let outcome = work(&UnitOfWork { conn: &tx });

        match outcome {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Run read-only `work` without opening a transaction
    pub fn read<T>(&self, work: impl FnOnce(&UnitOfWork<'_>) -> Result<T>) -> Result<T> {
        let conn = self.lock()?;
        work(&UnitOfWork { conn: &conn })
    }

    // === Convenience reads ===

    pub fn find_account_by_token(&self, token: &SessionToken) -> Result<Option<Account>> {
        self.read(|uow| uow.account_by_token(token))
    }

    pub fn find_account_by_username(&self, username: &str) -> Result<Option<Account>> {
        self.read(|uow| uow.account_by_username(username))
    }

    pub fn transaction_count(&self) -> Result<i64> {
        self.read(|uow| uow.transaction_count())
    }
}

/// Statements available inside one unit of work
pub struct UnitOfWork<'a> {
    conn: &'a Connection,
}

impl UnitOfWork<'_> {
    // === Accounts ===

    pub fn account_by_token(&self, token: &SessionToken) -> Result<Option<Account>> {
        self.query_account("session_token = ?", token.as_str())
    }

    pub fn account_by_username(&self, username: &str) -> Result<Option<Account>> {
        self.query_account("username = ?", username)
    }

    fn query_account(&self, predicate: &str, value: &str) -> Result<Option<Account>> {
        let sql = format!(
            "SELECT {} FROM accounts WHERE {}",
            ACCOUNT_COLUMNS, predicate
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map([value], row_to_account)?;
        let account = rows.next().transpose()?;
        Ok(account)
    }

    pub fn username_exists(&self, username: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM accounts WHERE username = ?",
            [username],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn insert_account(&self, account: &Account) -> Result<()> {
        self.conn.execute(
            "INSERT INTO accounts (account_id, name, username, password_hash, account_type,
                                   balance, session_token, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, CAST(? AS DECIMAL(18, 2)), ?,
                     CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP))",
            params![
                account.id.to_string(),
                account.name,
                account.username,
                account.password_hash,
                account.account_type.as_str(),
                account.balance.to_string(),
                account.session_token.as_str(),
                format_timestamp(&account.created_at),
                format_timestamp(&account.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn balance_of(&self, account_id: Uuid) -> Result<Decimal> {
        let raw: String = self.conn.query_row(
            "SELECT balance::VARCHAR FROM accounts WHERE account_id = ?",
            [account_id.to_string()],
            |row| row.get(0),
        )?;
        Decimal::from_str(&raw).map_err(|e| Error::store(format!("bad balance '{}': {}", raw, e)))
    }

    /// Add `amount` to the balance
    pub fn credit(&self, account_id: Uuid, amount: Amount) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE accounts
             SET balance = balance + CAST(? AS DECIMAL(18, 2)),
                 updated_at = CAST(? AS TIMESTAMP)
             WHERE account_id = ?",
            params![
                amount.value().to_string(),
                format_timestamp(&Utc::now()),
                account_id.to_string(),
            ],
        )?;
        if changed != 1 {
            return Err(Error::store(format!("account {} vanished during credit", account_id)));
        }
        Ok(())
    }

    /// Subtract `amount` if the balance covers it
    ///
    /// The balance is re-checked by the UPDATE itself; returns `false`
    /// (and changes nothing) when funds are insufficient.
    pub fn debit(&self, account_id: Uuid, amount: Amount) -> Result<bool> {
        let amount = amount.value().to_string();
        let changed = self.conn.execute(
            "UPDATE accounts
             SET balance = balance - CAST(? AS DECIMAL(18, 2)),
                 updated_at = CAST(? AS TIMESTAMP)
             WHERE account_id = ? AND balance >= CAST(? AS DECIMAL(18, 2))",
            params![
                amount,
                format_timestamp(&Utc::now()),
                account_id.to_string(),
                amount,
            ],
        )?;
        Ok(changed == 1)
    }

    pub fn update_name(&self, account_id: Uuid, name: &str) -> Result<()> {
        self.update_column(account_id, "name", name)
    }

    pub fn update_password_hash(&self, account_id: Uuid, password_hash: &str) -> Result<()> {
        self.update_column(account_id, "password_hash", password_hash)
    }

    pub fn update_account_type(&self, account_id: Uuid, account_type: AccountType) -> Result<()> {
        self.update_column(account_id, "account_type", account_type.as_str())
    }

    pub fn update_session_token(&self, account_id: Uuid, token: &SessionToken) -> Result<()> {
        self.update_column(account_id, "session_token", token.as_str())
    }

    // `column` is always one of the literals above, never user input
    fn update_column(&self, account_id: Uuid, column: &str, value: &str) -> Result<()> {
        let sql = format!(
            "UPDATE accounts SET {} = ?, updated_at = CAST(? AS TIMESTAMP) WHERE account_id = ?",
            column
        );
        let changed = self.conn.execute(
            &sql,
            params![value, format_timestamp(&Utc::now()), account_id.to_string()],
        )?;
        if changed != 1 {
            return Err(Error::InvalidSession);
        }
        Ok(())
    }

    /// Hard delete; the transaction log is left untouched
    pub fn delete_account(&self, account_id: Uuid) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM accounts WHERE account_id = ?",
            [account_id.to_string()],
        )?;
        Ok(deleted == 1)
    }

    // === Transaction log ===

    pub fn append_transaction(&self, tx: &Transaction) -> Result<()> {
        self.conn.execute(
            "INSERT INTO transactions (transaction_id, username, transaction_type, amount,
                                       counterparty, posted_at)
             VALUES (?, ?, ?, CAST(? AS DECIMAL(18, 2)), ?, CAST(? AS TIMESTAMP))",
            params![
                tx.id.to_string(),
                tx.username,
                tx.kind.as_str(),
                tx.amount.value().to_string(),
                tx.counterparty,
                format_timestamp(&tx.posted_at),
            ],
        )?;
        Ok(())
    }

    /// Rows owned by `username` plus transfers it received, in posting order
    pub fn history(&self, username: &str, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let mut sql = format!(
            "SELECT {} FROM transactions
             WHERE (username = ? OR (transaction_type = 'Transfer' AND counterparty = ?))",
            TRANSACTION_COLUMNS
        );
        let mut values: Vec<String> = vec![username.to_string(), username.to_string()];

        if let Some(start) = filter.start_date {
            sql.push_str(" AND CAST(posted_at AS DATE) >= CAST(? AS DATE)");
            values.push(start.format("%Y-%m-%d").to_string());
        }
        if let Some(end) = filter.end_date {
            sql.push_str(" AND CAST(posted_at AS DATE) <= CAST(? AS DATE)");
            values.push(end.format("%Y-%m-%d").to_string());
        }
        if let Some(kind) = filter.kind {
            sql.push_str(" AND transaction_type = ?");
            values.push(kind.as_str().to_string());
        }
        sql.push_str(" ORDER BY seq");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), row_to_transaction)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub fn transaction_count(&self) -> Result<i64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(count)
    }

    // === Service requests ===

    pub fn append_service_request(&self, request: &ServiceRequest) -> Result<()> {
        self.conn.execute(
            "INSERT INTO service_requests (request_id, username, service_kind, requested_at)
             VALUES (?, ?, ?, CAST(? AS TIMESTAMP))",
            params![
                request.id.to_string(),
                request.username,
                request.kind.as_str(),
                format_timestamp(&request.requested_at),
            ],
        )?;
        Ok(())
    }

    pub fn service_requests(&self, username: &str) -> Result<Vec<ServiceRequest>> {
        let mut stmt = self.conn.prepare(
            "SELECT request_id, username, service_kind, requested_at::VARCHAR
             FROM service_requests
             WHERE username = ?
             ORDER BY seq",
        )?;
        let rows = stmt.query_map([username], |row| {
            Ok(ServiceRequest {
                id: parse_column(row, 0, |s| Uuid::parse_str(s))?,
                username: row.get(1)?,
                kind: parse_column(row, 2, ServiceKind::from_str)?,
                requested_at: parse_column(row, 3, parse_timestamp)?,
            })
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }
}

fn row_to_account(row: &duckdb::Row) -> duckdb::Result<Account> {
    // Column order follows ACCOUNT_COLUMNS
    Ok(Account {
        id: parse_column(row, 0, |s| Uuid::parse_str(s))?,
        name: row.get(1)?,
        username: row.get(2)?,
        password_hash: row.get(3)?,
        account_type: parse_column(row, 4, AccountType::from_str)?,
        balance: parse_column(row, 5, Decimal::from_str)?,
        session_token: parse_column(row, 6, SessionToken::parse)?,
        created_at: parse_column(row, 7, parse_timestamp)?,
        updated_at: parse_column(row, 8, parse_timestamp)?,
    })
}

fn row_to_transaction(row: &duckdb::Row) -> duckdb::Result<Transaction> {
    // Column order follows TRANSACTION_COLUMNS
    Ok(Transaction {
        id: parse_column(row, 0, |s| Uuid::parse_str(s))?,
        username: row.get(1)?,
        kind: parse_column(row, 2, TransactionKind::from_str)?,
        amount: parse_column(row, 3, |s| {
            Decimal::from_str(s)
                .map_err(|e| Error::store(e.to_string()))
                .and_then(Amount::new)
        })?,
        counterparty: row.get(4)?,
        posted_at: parse_column(row, 5, parse_timestamp)?,
    })
}

/// Read a text column and convert it, reporting failures as conversion errors
fn parse_column<T, E>(
    row: &duckdb::Row,
    idx: usize,
    parse: impl FnOnce(&str) -> std::result::Result<T, E>,
) -> duckdb::Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    parse(&raw).map_err(|e| duckdb::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// Parse the text form DuckDB produces for a TIMESTAMP column
fn parse_timestamp(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
}
