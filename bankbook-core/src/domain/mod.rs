//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
pub mod credentials;
pub mod money;
pub mod result;
mod service_request;
mod transaction;

pub use account::{
    validate_identifier, validate_username, Account, AccountChange, AccountDetails, AccountType,
    NewAccount, FORBIDDEN_CHARS,
};
pub use credentials::{Argon2Params, SessionToken};
pub use money::Amount;
pub use service_request::{ServiceKind, ServiceRequest};
pub use transaction::{Direction, HistoryEntry, Transaction, TransactionFilter, TransactionKind};
