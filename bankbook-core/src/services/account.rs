//! Account service - account creation, profile edits and closure

use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::credentials::{hash_password, validate_password_strength};
use crate::domain::money::{self, Amount};
use crate::domain::result::{Error, Result};
use crate::domain::{
    validate_identifier, validate_username, Account, AccountChange, AccountDetails, Argon2Params,
    NewAccount, SessionToken, Transaction, TransactionKind,
};

/// Outcome of a successful registration
#[derive(Debug, Serialize)]
pub struct CreatedAccount {
    pub account: AccountDetails,
    #[serde(skip)]
    pub session_token: SessionToken,
}

/// Account lifecycle service
pub struct AccountService {
    repository: Arc<DuckDbRepository>,
    argon2_params: Argon2Params,
}

impl AccountService {
    pub fn new(repository: Arc<DuckDbRepository>, argon2_params: Argon2Params) -> Self {
        Self {
            repository,
            argon2_params,
        }
    }

    /// Register a new account and issue its first session token
    ///
    /// A positive opening balance is logged as a deposit in the same unit
    /// of work as the account row.
    pub fn create(&self, new_account: NewAccount) -> Result<CreatedAccount> {
        let name = new_account.name.trim().to_string();
        let username = new_account.username.trim().to_string();

        validate_identifier("name", &name)?;
        validate_username(&username)?;
        validate_password_strength(&new_account.password)?;
        let opening = money::opening_balance(new_account.initial_deposit)?;

        let password_hash = hash_password(&new_account.password, &self.argon2_params)?;
        let now = Utc::now().trunc_subsecs(6);
        let account = Account {
            id: Uuid::new_v4(),
            name,
            username,
            password_hash,
            account_type: new_account.account_type,
            balance: opening,
            session_token: SessionToken::generate(),
            created_at: now,
            updated_at: now,
        };

        self.repository.unit_of_work(|uow| {
            if uow.username_exists(&account.username)? {
                return Err(Error::UsernameTaken(account.username.clone()));
            }
            uow.insert_account(&account)?;
            if !opening.is_zero() {
                let deposit = Transaction::new(
                    &account.username,
                    TransactionKind::Deposit,
                    Amount::new(opening)?,
                );
                uow.append_transaction(&deposit)?;
            }
            Ok(())
        })?;

        tracing::info!(account_id = %account.id, "account created");

        Ok(CreatedAccount {
            account: account.details(),
            session_token: account.session_token,
        })
    }

    /// Current details of the session's account
    pub fn details(&self, token: &SessionToken) -> Result<AccountDetails> {
        self.repository
            .find_account_by_token(token)?
            .map(|account| account.details())
            .ok_or(Error::InvalidSession)
    }

    /// Apply one profile change
    pub fn edit(&self, token: &SessionToken, change: AccountChange) -> Result<AccountDetails> {
        self.edit_many(token, vec![change])
    }

    /// Apply several profile changes as one unit of work
    ///
    /// Every change is validated before anything is written, so a bad value
    /// leaves the account untouched.
    pub fn edit_many(
        &self,
        token: &SessionToken,
        changes: Vec<AccountChange>,
    ) -> Result<AccountDetails> {
        if changes.is_empty() {
            return Err(Error::invalid_input("no changes given"));
        }

        // hash before taking the connection lock
        let prepared = changes
            .into_iter()
            .map(|change| self.prepare(change))
            .collect::<Result<Vec<_>>>()?;

        let updated = self.repository.unit_of_work(|uow| {
            let account = uow.account_by_token(token)?.ok_or(Error::InvalidSession)?;
            for change in &prepared {
                match change {
                    PreparedChange::Name(name) => uow.update_name(account.id, name)?,
                    PreparedChange::PasswordHash(hash) => {
                        uow.update_password_hash(account.id, hash)?
                    }
                    PreparedChange::AccountType(t) => uow.update_account_type(account.id, *t)?,
                }
            }
            uow.account_by_token(token)?.ok_or(Error::InvalidSession)
        })?;

        let fields: Vec<&str> = prepared.iter().map(PreparedChange::field).collect();
        tracing::info!(account_id = %updated.id, fields = ?fields, "account updated");
        Ok(updated.details())
    }

    fn prepare(&self, change: AccountChange) -> Result<PreparedChange> {
        Ok(match change {
            AccountChange::Name(name) => {
                let name = name.trim().to_string();
                validate_identifier("name", &name)?;
                PreparedChange::Name(name)
            }
            AccountChange::Password(password) => {
                validate_password_strength(&password)?;
                PreparedChange::PasswordHash(hash_password(&password, &self.argon2_params)?)
            }
            AccountChange::AccountType(account_type) => PreparedChange::AccountType(account_type),
        })
    }

    /// Hard delete the session's account
    pub fn close(&self, token: &SessionToken) -> Result<AccountDetails> {
        let closed = self.repository.unit_of_work(|uow| {
            let account = uow.account_by_token(token)?.ok_or(Error::InvalidSession)?;
            if !uow.delete_account(account.id)? {
                return Err(Error::InvalidSession);
            }
            Ok(account)
        })?;

        tracing::info!(account_id = %closed.id, "account closed");
        Ok(closed.details())
    }
}

enum PreparedChange {
    Name(String),
    PasswordHash(String),
    AccountType(crate::domain::AccountType),
}

impl PreparedChange {
    fn field(&self) -> &'static str {
        match self {
            PreparedChange::Name(_) => "name",
            PreparedChange::PasswordHash(_) => "password",
            PreparedChange::AccountType(_) => "account_type",
        }
    }
}
