//! Money amounts

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Number of fractional digits a stored amount may carry (DECIMAL(18,2))
pub const MONEY_SCALE: u32 = 2;

/// Largest amount a single ledger operation may move
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_232, 23_283, 0, false, 2);

/// A strictly positive amount of money with at most two fractional digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// Validate and wrap a decimal
    pub fn new(value: Decimal) -> Result<Self> {
        if value <= Decimal::ZERO {
            return Err(Error::invalid_input("amount must be greater than zero"));
        }
        check_scale(value)?;
        if value > MAX_AMOUNT {
            return Err(Error::invalid_input(format!(
                "amount must not exceed {}",
                MAX_AMOUNT
            )));
        }
        Ok(Self(value.normalize()))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_money(self.0))
    }
}

impl FromStr for Amount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(parse_decimal(s)?)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = Error;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// Validate an opening balance (zero allowed, same precision rules)
pub fn opening_balance(value: Decimal) -> Result<Decimal> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(Error::invalid_input("initial deposit cannot be negative"));
    }
    check_scale(value)?;
    if value > MAX_AMOUNT {
        return Err(Error::invalid_input(format!(
            "initial deposit must not exceed {}",
            MAX_AMOUNT
        )));
    }
    Ok(value.normalize())
}

/// Parse user input like "12", "12.5" or " 1000.00 "
pub fn parse_decimal(s: &str) -> Result<Decimal> {
    Decimal::from_str(s.trim())
        .map_err(|_| Error::invalid_input(format!("'{}' is not a valid amount", s.trim())))
}

/// Render with exactly two fractional digits
pub fn format_money(value: Decimal) -> String {
    format!("{:.2}", value)
}

fn check_scale(value: Decimal) -> Result<()> {
    if value.normalize().scale() > MONEY_SCALE {
        return Err(Error::invalid_input(format!(
            "amount must have at most {} decimal places",
            MONEY_SCALE
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_amount_constant() {
        assert_eq!(MAX_AMOUNT, Decimal::from_str("1000000000000.00").unwrap());
    }

    #[test]
    fn test_amount_must_be_positive() {
        assert!(Amount::from_str("0").is_err());
        assert!(Amount::from_str("-5").is_err());
        assert!(Amount::from_str("0.01").is_ok());
    }

    #[test]
    fn test_amount_precision() {
        assert!(Amount::from_str("10.125").is_err());
        // trailing zeros do not count as precision
        assert_eq!(
            Amount::from_str("10.500").unwrap().value(),
            Decimal::from_str("10.5").unwrap()
        );
    }

    #[test]
    fn test_amount_upper_bound() {
        assert!(Amount::from_str("1000000000000").is_ok());
        assert!(Amount::from_str("1000000000000.01").is_err());
    }

    #[test]
    fn test_amount_rejects_garbage() {
        let err = Amount::from_str("ten").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_opening_balance_allows_zero() {
        assert_eq!(opening_balance(Decimal::ZERO).unwrap(), Decimal::ZERO);
        assert!(opening_balance(Decimal::from_str("-0.01").unwrap()).is_err());
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(Decimal::from_str("7").unwrap()), "7.00");
        assert_eq!(format_money(Decimal::from_str("7.5").unwrap()), "7.50");
    }
}
