//! Result and error types for the core library

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
///
/// Validation failures (`InvalidInput`, `InvalidSession`, ...) are reported
/// before anything is written. `StoreUnavailable` covers every database
/// failure; the unit of work it happened in has been rolled back.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid session token")]
    InvalidSession,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Insufficient balance")]
    InsufficientFunds,

    #[error("Unknown recipient: {0}")]
    UnknownRecipient(String),

    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Stable machine-readable code, used for event logs and JSON output
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "invalid_input",
            Error::InvalidSession => "invalid_session",
            Error::InvalidCredentials => "invalid_credentials",
            Error::InsufficientFunds => "insufficient_funds",
            Error::UnknownRecipient(_) => "unknown_recipient",
            Error::UsernameTaken(_) => "username_taken",
            Error::StoreUnavailable(_) | Error::Io(_) => "store_unavailable",
            Error::Config(_) => "config",
            Error::Json(_) | Error::Csv(_) => "serialization",
        }
    }
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result with optional context (for `--json` output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: None,
        }
    }

    /// Create a failed result with context
    pub fn fail_with_context(
        error: impl Into<String>,
        context: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            context: Some(context),
            ..Self::fail(error)
        }
    }
}
