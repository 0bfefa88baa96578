//! Transaction log domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::Amount;
use super::result::{Error, Result};

/// Kind of posted transaction, stored as its display name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "Deposit",
            TransactionKind::Withdrawal => "Withdrawal",
            TransactionKind::Transfer => "Transfer",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "deposit" => Ok(TransactionKind::Deposit),
            "withdrawal" | "withdraw" => Ok(TransactionKind::Withdrawal),
            "transfer" => Ok(TransactionKind::Transfer),
            other => Err(Error::invalid_input(format!(
                "unknown transaction type '{}'",
                other
            ))),
        }
    }
}

/// One row of the append-only transaction log
///
/// Transfers are logged once, under the sender; `counterparty` names the
/// recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub username: String,
    pub kind: TransactionKind,
    pub amount: Amount,
    pub counterparty: Option<String>,
    pub posted_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(username: impl Into<String>, kind: TransactionKind, amount: Amount) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            kind,
            amount,
            counterparty: None,
            // stored as TIMESTAMP (microseconds)
            posted_at: Utc::now().trunc_subsecs(6),
        }
    }

    pub fn transfer(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: Amount,
    ) -> Self {
        let mut tx = Self::new(sender, TransactionKind::Transfer, amount);
        tx.counterparty = Some(recipient.into());
        tx
    }

    /// Signed effect of this row on `viewer`'s balance
    pub fn balance_effect(&self, viewer: &str) -> Decimal {
        let amount = self.amount.value();
        match self.kind {
            TransactionKind::Deposit => amount,
            TransactionKind::Withdrawal => -amount,
            TransactionKind::Transfer if self.username == viewer => -amount,
            TransactionKind::Transfer => amount,
        }
    }
}

/// Which side of a history entry the viewing account is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Posted by the viewing account
    Outgoing,
    /// A transfer received from someone else
    Incoming,
}

/// A transaction as seen from one account's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub direction: Direction,
}

impl HistoryEntry {
    pub fn for_viewer(transaction: Transaction, viewer: &str) -> Self {
        let direction = if transaction.username == viewer {
            Direction::Outgoing
        } else {
            Direction::Incoming
        };
        Self {
            transaction,
            direction,
        }
    }
}

/// Optional history filters; dates are inclusive and compared in UTC
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub kind: Option<TransactionKind>,
}

impl TransactionFilter {
    pub fn validate(&self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(Error::invalid_input("start date is after end date"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(s: &str) -> Amount {
        s.parse().unwrap()
    }

    #[test]
    fn test_kind_round_trips_through_display() {
        for kind in [
            TransactionKind::Deposit,
            TransactionKind::Withdrawal,
            TransactionKind::Transfer,
        ] {
            assert_eq!(kind.to_string().parse::<TransactionKind>().unwrap(), kind);
        }
        assert!("refund".parse::<TransactionKind>().is_err());
    }

    #[test]
    fn test_transfer_effect_depends_on_viewer() {
        let tx = Transaction::transfer("alice", "bob", amount("25"));
        assert_eq!(tx.balance_effect("alice"), Decimal::from(-25));
        assert_eq!(tx.balance_effect("bob"), Decimal::from(25));
    }

    #[test]
    fn test_history_direction() {
        let tx = Transaction::transfer("alice", "bob", amount("5"));
        assert_eq!(
            HistoryEntry::for_viewer(tx.clone(), "alice").direction,
            Direction::Outgoing
        );
        assert_eq!(HistoryEntry::for_viewer(tx, "bob").direction, Direction::Incoming);
    }

    #[test]
    fn test_filter_rejects_inverted_range() {
        let filter = TransactionFilter {
            start_date: NaiveDate::from_ymd_opt(2024, 2, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            kind: None,
        };
        assert!(filter.validate().is_err());
        assert!(TransactionFilter::default().validate().is_ok());
    }
}
