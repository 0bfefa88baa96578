//! Auth service - credential checks and session token lifecycle

use std::sync::Arc;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::credentials::verify_password;
use crate::domain::result::{Error, Result};
use crate::domain::{Account, SessionToken};

/// Auth service
pub struct AuthService {
    repository: Arc<DuckDbRepository>,
    rotate_on_login: bool,
}

impl AuthService {
    pub fn new(repository: Arc<DuckDbRepository>, rotate_on_login: bool) -> Self {
        Self {
            repository,
            rotate_on_login,
        }
    }

    /// Exchange username and password for the account's session token
    ///
    /// Unknown usernames and wrong passwords fail identically.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<SessionToken> {
        let account = self
            .repository
            .find_account_by_username(username.trim())?
            .ok_or(Error::InvalidCredentials)?;

        if !verify_password(password, &account.password_hash)? {
            tracing::info!(account_id = %account.id, "login rejected");
            return Err(Error::InvalidCredentials);
        }

        if !self.rotate_on_login {
            tracing::info!(account_id = %account.id, "login");
            return Ok(account.session_token);
        }

        let fresh = SessionToken::generate();
        self.repository
            .unit_of_work(|uow| uow.update_session_token(account.id, &fresh))?;
        tracing::info!(account_id = %account.id, rotated = true, "login");
        Ok(fresh)
    }

    /// Invalidate the current token by replacing it
    pub fn logout(&self, token: &SessionToken) -> Result<()> {
        let account_id = self.repository.unit_of_work(|uow| {
            let account = uow.account_by_token(token)?.ok_or(Error::InvalidSession)?;
            uow.update_session_token(account.id, &SessionToken::generate())?;
            Ok(account.id)
        })?;
        tracing::info!(account_id = %account_id, "logout");
        Ok(())
    }

    /// Resolve a token to its account
    pub fn resolve(&self, token: &SessionToken) -> Result<Account> {
        self.repository
            .find_account_by_token(token)?
            .ok_or(Error::InvalidSession)
    }
}
