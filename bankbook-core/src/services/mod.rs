//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and repository access. Each service
//! focuses on a specific use case or feature area.

mod account;
mod auth;
mod history;
mod ledger;
pub mod logging;
pub mod migration;
mod service_request;

pub use account::{AccountService, CreatedAccount};
pub use auth::AuthService;
pub use history::HistoryService;
pub use ledger::{LedgerReceipt, LedgerService};
pub use logging::{CommandStats, EntryPoint, LogEntry, LogEvent, LogFilter, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use service_request::ServiceRequestService;
