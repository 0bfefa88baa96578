//! Account domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::credentials::SessionToken;
use super::result::{Error, Result};

/// Characters that may not appear in a name or username
pub const FORBIDDEN_CHARS: [char; 10] = ['!', '@', '#', '$', '%', '^', '&', '*', '(', ')'];

/// Kind of account, chosen at creation and editable later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    Personal,
    Business,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Personal => "Personal",
            AccountType::Business => "Business",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "personal" => Ok(AccountType::Personal),
            "business" => Ok(AccountType::Business),
            other => Err(Error::invalid_input(format!(
                "unknown account type '{}' (expected Personal or Business)",
                other
            ))),
        }
    }
}

/// A bank account as stored in the `accounts` table
///
/// Holds the password hash and session token, so it is never serialized
/// as-is; use [`AccountDetails`] for anything user facing.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub password_hash: String,
    pub account_type: AccountType,
    pub balance: Decimal,
    pub session_token: SessionToken,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn details(&self) -> AccountDetails {
        AccountDetails {
            id: self.id,
            name: self.name.clone(),
            username: self.username.clone(),
            account_type: self.account_type,
            balance: self.balance,
            created_at: self.created_at,
        }
    }
}

/// Public view of an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountDetails {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub account_type: AccountType,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Input for account creation
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub username: String,
    pub password: String,
    pub account_type: AccountType,
    pub initial_deposit: Decimal,
}

/// A single profile change
#[derive(Debug, Clone)]
pub enum AccountChange {
    Name(String),
    Password(String),
    AccountType(AccountType),
}

/// Validate a display name or username
///
/// `field` is only used in the error message.
pub fn validate_identifier(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::invalid_input(format!("{} cannot be empty", field)));
    }
    if let Some(c) = value.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(Error::invalid_input(format!(
            "{} should not contain special characters (found '{}')",
            field, c
        )));
    }
    Ok(())
}

/// Usernames are also used as lookup keys, so whitespace is not allowed
pub fn validate_username(username: &str) -> Result<()> {
    validate_identifier("username", username)?;
    if username.chars().any(char::is_whitespace) {
        return Err(Error::invalid_input("username cannot contain whitespace"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_type_parsing() {
        assert_eq!("personal".parse::<AccountType>().unwrap(), AccountType::Personal);
        assert_eq!(" BUSINESS ".parse::<AccountType>().unwrap(), AccountType::Business);
        assert!("savings".parse::<AccountType>().is_err());
    }

    #[test]
    fn test_identifier_rejects_each_forbidden_char() {
        for c in FORBIDDEN_CHARS {
            let value = format!("ali{}ce", c);
            assert!(validate_identifier("name", &value).is_err(), "{} accepted", c);
        }
        assert!(validate_identifier("name", "Alice Smith-Jones").is_ok());
    }

    #[test]
    fn test_identifier_rejects_blank() {
        assert!(validate_identifier("name", "   ").is_err());
    }

    #[test]
    fn test_username_rejects_whitespace() {
        assert!(validate_username("alice smith").is_err());
        assert!(validate_username("alice_smith").is_ok());
    }
}
