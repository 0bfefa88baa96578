//! Ledger service - deposits, withdrawals and transfers
//!
//! Each operation reads, checks, mutates balances and appends exactly one
//! log row inside a single unit of work. Any failure rolls the unit back.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::{Error, Result};
use crate::domain::{Amount, SessionToken, Transaction, TransactionKind};

/// Result of a posted ledger operation
#[derive(Debug, Clone, Serialize)]
pub struct LedgerReceipt {
    pub transaction: Transaction,
    /// Balance of the acting account after posting
    pub balance: Decimal,
}

/// Ledger service
pub struct LedgerService {
    repository: Arc<DuckDbRepository>,
}

impl LedgerService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    pub fn deposit(&self, token: &SessionToken, amount: Amount) -> Result<LedgerReceipt> {
        let receipt = self.repository.unit_of_work(|uow| {
            let account = uow.account_by_token(token)?.ok_or(Error::InvalidSession)?;
            uow.credit(account.id, amount)?;
            let tx = Transaction::new(&account.username, TransactionKind::Deposit, amount);
            uow.append_transaction(&tx)?;
            Ok(LedgerReceipt {
                balance: uow.balance_of(account.id)?,
                transaction: tx,
            })
        })?;

        tracing::info!(transaction_id = %receipt.transaction.id, %amount, "deposit posted");
        Ok(receipt)
    }

    pub fn withdraw(&self, token: &SessionToken, amount: Amount) -> Result<LedgerReceipt> {
        let receipt = self.repository.unit_of_work(|uow| {
            let account = uow.account_by_token(token)?.ok_or(Error::InvalidSession)?;
            if !uow.debit(account.id, amount)? {
                return Err(Error::InsufficientFunds);
            }
            let tx = Transaction::new(&account.username, TransactionKind::Withdrawal, amount);
            uow.append_transaction(&tx)?;
            Ok(LedgerReceipt {
                balance: uow.balance_of(account.id)?,
                transaction: tx,
            })
        })?;

        tracing::info!(transaction_id = %receipt.transaction.id, %amount, "withdrawal posted");
        Ok(receipt)
    }

    /// Move funds to another account, logged once under the sender
    pub fn transfer(
        &self,
        token: &SessionToken,
        recipient: &str,
        amount: Amount,
    ) -> Result<LedgerReceipt> {
        let recipient = recipient.trim();
        let receipt = self.repository.unit_of_work(|uow| {
            let sender = uow.account_by_token(token)?.ok_or(Error::InvalidSession)?;
            if sender.username == recipient {
                return Err(Error::invalid_input("cannot transfer to the same account"));
            }
            let target = uow
                .account_by_username(recipient)?
                .ok_or_else(|| Error::UnknownRecipient(recipient.to_string()))?;

            if !uow.debit(sender.id, amount)? {
                return Err(Error::InsufficientFunds);
            }
            uow.credit(target.id, amount)?;

            let tx = Transaction::transfer(&sender.username, &target.username, amount);
            uow.append_transaction(&tx)?;
            Ok(LedgerReceipt {
                balance: uow.balance_of(sender.id)?,
                transaction: tx,
            })
        })?;

        tracing::info!(transaction_id = %receipt.transaction.id, %amount, "transfer posted");
        Ok(receipt)
    }
}
