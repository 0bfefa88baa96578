//! History service - transaction listing and CSV export

use std::io::Write;
use std::sync::Arc;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::money::format_money;
use crate::domain::result::{Error, Result};
use crate::domain::{HistoryEntry, SessionToken, TransactionFilter};

/// History service
pub struct HistoryService {
    repository: Arc<DuckDbRepository>,
}

impl HistoryService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Transactions owned by the session's account plus transfers it received
    pub fn list(
        &self,
        token: &SessionToken,
        filter: &TransactionFilter,
    ) -> Result<Vec<HistoryEntry>> {
        filter.validate()?;
        self.repository.read(|uow| {
            let account = uow.account_by_token(token)?.ok_or(Error::InvalidSession)?;
            let rows = uow.history(&account.username, filter)?;
            Ok(rows
                .into_iter()
                .map(|tx| HistoryEntry::for_viewer(tx, &account.username))
                .collect())
        })
    }

    /// Write the filtered history as CSV, returning the number of rows
    pub fn export_csv<W: Write>(
        &self,
        token: &SessionToken,
        filter: &TransactionFilter,
        writer: W,
    ) -> Result<usize> {
        let entries = self.list(token, filter)?;
        write_csv(&entries, writer)?;
        Ok(entries.len())
    }
}

fn write_csv<W: Write>(entries: &[HistoryEntry], writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "transaction_id",
        "posted_at",
        "type",
        "direction",
        "amount",
        "account",
        "counterparty",
    ])?;

    for entry in entries {
        let tx = &entry.transaction;
        csv.write_record([
            tx.id.to_string(),
            tx.posted_at.to_rfc3339(),
            tx.kind.to_string(),
            format!("{:?}", entry.direction).to_lowercase(),
            format_money(tx.amount.value()),
            tx.username.clone(),
            tx.counterparty.clone().unwrap_or_default(),
        ])?;
    }

    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Account, AccountType, Amount, Direction, Transaction, TransactionKind};
    use chrono::{SubsecRound, Utc};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn setup() -> (Arc<DuckDbRepository>, HistoryService, SessionToken, SessionToken) {
        let repo = Arc::new(DuckDbRepository::in_memory().unwrap());
        repo.ensure_schema().unwrap();
        let mut tokens = Vec::new();
        for username in ["alice", "bob"] {
            let now = Utc::now().trunc_subsecs(6);
            let account = Account {
                id: Uuid::new_v4(),
                name: username.to_string(),
                username: username.to_string(),
                password_hash: "$argon2id$placeholder".to_string(),
                account_type: AccountType::Personal,
                balance: Decimal::from(100),
                session_token: SessionToken::generate(),
                created_at: now,
                updated_at: now,
            };
            repo.unit_of_work(|uow| uow.insert_account(&account)).unwrap();
            tokens.push(account.session_token);
        }

        let five: Amount = "5".parse().unwrap();
        repo.unit_of_work(|uow| {
            uow.append_transaction(&Transaction::new("alice", TransactionKind::Deposit, five))?;
            uow.append_transaction(&Transaction::transfer("bob", "alice", five))?;
            uow.append_transaction(&Transaction::new("bob", TransactionKind::Withdrawal, five))
        })
        .unwrap();

        let bob = tokens.pop().unwrap();
        let alice = tokens.pop().unwrap();
        (Arc::clone(&repo), HistoryService::new(repo), alice, bob)
    }

    #[test]
    fn test_list_marks_direction() {
        let (_, history, alice, bob) = setup();

        let entries = history.list(&alice, &TransactionFilter::default()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].direction, Direction::Outgoing);
        assert_eq!(entries[1].direction, Direction::Incoming);

        let entries = history.list(&bob, &TransactionFilter::default()).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.direction == Direction::Outgoing));
    }

    #[test]
    fn test_list_filters_by_kind() {
        let (_, history, alice, _) = setup();
        let filter = TransactionFilter {
            kind: Some(TransactionKind::Transfer),
            ..Default::default()
        };
        let entries = history.list(&alice, &filter).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].transaction.counterparty.as_deref(), Some("alice"));
    }

    #[test]
    fn test_list_requires_session() {
        let (_, history, _, _) = setup();
        assert!(matches!(
            history.list(&SessionToken::generate(), &TransactionFilter::default()),
            Err(Error::InvalidSession)
        ));
    }

    #[test]
    fn test_export_csv() {
        let (_, history, alice, _) = setup();
        let mut out = Vec::new();
        let count = history
            .export_csv(&alice, &TransactionFilter::default(), &mut out)
            .unwrap();
        assert_eq!(count, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("transaction_id,posted_at,type"));
        assert!(lines[1].contains(",Deposit,outgoing,5.00,alice,"));
        assert!(lines[2].ends_with(",Transfer,incoming,5.00,bob,alice"));
    }
}
