//! Bankbook Core - Business logic for a single-user bank account ledger
//!
//! The crate is split into layers:
//!
//! - **domain**: Core business entities (Account, Transaction, etc.) and validation
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete storage implementation (DuckDB)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbRepository;
use config::Config;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult};
pub use services::{CommandStats, EntryPoint, LogEntry, LogEvent, LogFilter, LoggingService};
pub use domain::{
    Account, AccountChange, AccountDetails, AccountType, Amount, Direction, HistoryEntry,
    NewAccount, ServiceKind, ServiceRequest, SessionToken, Transaction, TransactionFilter,
    TransactionKind,
};

/// Database file inside the data directory
pub const DB_FILENAME: &str = "bankbook.duckdb";

/// Main context for Bankbook operations
///
/// This is the primary entry point for all business logic. It holds
/// the database connection, configuration, and all services.
pub struct BankbookContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub account_service: AccountService,
    pub auth_service: AuthService,
    pub ledger_service: LedgerService,
    pub history_service: HistoryService,
    pub service_request_service: ServiceRequestService,
}

impl BankbookContext {
    /// Open (or create) the ledger in `data_dir`
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;
        let config = Config::load(data_dir)?;

        let db_path = data_dir.join(DB_FILENAME);
        let repository = Arc::new(DuckDbRepository::new(&db_path)?);
        repository.ensure_schema()?;

        Ok(Self::with_repository(config, repository))
    }

    /// Wire services around an already migrated repository
    pub fn with_repository(config: Config, repository: Arc<DuckDbRepository>) -> Self {
        let account_service =
            AccountService::new(Arc::clone(&repository), config.argon2_params.clone());
        let auth_service =
            AuthService::new(Arc::clone(&repository), config.rotate_session_on_login);
        let ledger_service = LedgerService::new(Arc::clone(&repository));
        let history_service = HistoryService::new(Arc::clone(&repository));
        let service_request_service = ServiceRequestService::new(Arc::clone(&repository));

        Self {
            config,
            repository,
            account_service,
            auth_service,
            ledger_service,
            history_service,
            service_request_service,
        }
    }
}
