//! Account service requests (checkbooks, cards, ...)

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceKind {
    Checkbook,
    Card,
    RecurringPayments,
    DirectDebits,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 4] = [
        ServiceKind::Checkbook,
        ServiceKind::Card,
        ServiceKind::RecurringPayments,
        ServiceKind::DirectDebits,
    ];

    /// Stored value
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Checkbook => "Checkbook",
            ServiceKind::Card => "Card",
            ServiceKind::RecurringPayments => "RecurringPayments",
            ServiceKind::DirectDebits => "DirectDebits",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ServiceKind::Checkbook => "Checkbook",
            ServiceKind::Card => "Debit/Credit Card",
            ServiceKind::RecurringPayments => "Recurring Payments",
            ServiceKind::DirectDebits => "Direct Debits",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ServiceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "checkbook" => Ok(ServiceKind::Checkbook),
            "card" | "debitcard" | "creditcard" | "debitcreditcard" => Ok(ServiceKind::Card),
            "recurringpayments" | "recurring" => Ok(ServiceKind::RecurringPayments),
            "directdebits" | "directdebit" => Ok(ServiceKind::DirectDebits),
            _ => Err(Error::invalid_input(format!("unknown service '{}'", s.trim()))),
        }
    }
}

/// A submitted service request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: Uuid,
    pub username: String,
    pub kind: ServiceKind,
    pub requested_at: DateTime<Utc>,
}

impl ServiceRequest {
    pub fn new(username: impl Into<String>, kind: ServiceKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            kind,
            requested_at: Utc::now().trunc_subsecs(6),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_service_kind() {
        assert_eq!("checkbook".parse::<ServiceKind>().unwrap(), ServiceKind::Checkbook);
        assert_eq!("Debit/Credit Card".parse::<ServiceKind>().unwrap(), ServiceKind::Card);
        assert_eq!(
            "recurring-payments".parse::<ServiceKind>().unwrap(),
            ServiceKind::RecurringPayments
        );
        assert!("loan".parse::<ServiceKind>().is_err());
    }

    #[test]
    fn test_stored_value_parses_back() {
        for kind in ServiceKind::ALL {
            assert_eq!(kind.as_str().parse::<ServiceKind>().unwrap(), kind);
        }
    }
}
