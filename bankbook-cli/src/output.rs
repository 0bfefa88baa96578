//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, CellAlignment, ContentArrangement, Table};

use bankbook_core::domain::money::format_money;
use bankbook_core::{AccountDetails, Direction, HistoryEntry, ServiceRequest};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Vertical key/value table of account details
pub fn account_table(details: &AccountDetails) -> Table {
    let mut table = create_table();
    table.add_row(vec!["Name", details.name.as_str()]);
    table.add_row(vec!["Username", details.username.as_str()]);
    table.add_row(vec!["Account type", details.account_type.as_str()]);
    table.add_row(vec![
        Cell::new("Balance"),
        Cell::new(format_money(details.balance)).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        "Opened".to_string(),
        details.created_at.format("%Y-%m-%d").to_string(),
    ]);
    table
}

pub fn history_table(entries: &[HistoryEntry]) -> Table {
    let mut table = create_table();
    table.set_header(vec!["Date", "Type", "Amount", "Counterparty"]);

    for entry in entries {
        let tx = &entry.transaction;
        let (viewer, counterparty) = match (entry.direction, tx.counterparty.as_deref()) {
            (Direction::Incoming, to) => (to.unwrap_or_default(), format!("from {}", tx.username)),
            (Direction::Outgoing, Some(to)) => (tx.username.as_str(), format!("to {}", to)),
            (Direction::Outgoing, None) => (tx.username.as_str(), String::new()),
        };
        let sign = if tx.balance_effect(viewer).is_sign_negative() {
            "-"
        } else {
            "+"
        };
        table.add_row(vec![
            Cell::new(tx.posted_at.format("%Y-%m-%d %H:%M").to_string()),
            Cell::new(tx.kind.as_str()),
            Cell::new(format!("{}{}", sign, tx.amount)).set_alignment(CellAlignment::Right),
            Cell::new(counterparty),
        ]);
    }
    table
}

pub fn service_requests_table(requests: &[ServiceRequest]) -> Table {
    let mut table = create_table();
    table.set_header(vec!["Requested", "Service"]);
    for request in requests {
        table.add_row(vec![
            request.requested_at.format("%Y-%m-%d %H:%M").to_string(),
            request.kind.label().to_string(),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use bankbook_core::{Amount, Transaction, TransactionKind};
    use rust_decimal::Decimal;

    fn amount(units: i64) -> Amount {
        Amount::new(Decimal::from(units)).unwrap()
    }

    #[test]
    fn test_history_table_signs_follow_viewer() {
        let entries = vec![
            HistoryEntry::for_viewer(
                Transaction::new("alice", TransactionKind::Deposit, amount(40)),
                "alice",
            ),
            HistoryEntry::for_viewer(
                Transaction::new("alice", TransactionKind::Withdrawal, amount(15)),
                "alice",
            ),
            HistoryEntry::for_viewer(Transaction::transfer("alice", "bob", amount(7)), "alice"),
            HistoryEntry::for_viewer(Transaction::transfer("bob", "alice", amount(3)), "alice"),
        ];
        let rendered = history_table(&entries).to_string();
        assert!(rendered.contains("+40"));
        assert!(rendered.contains("-15"));
        assert!(rendered.contains("-7"));
        assert!(rendered.contains("to bob"));
        assert!(rendered.contains("+3"));
        assert!(rendered.contains("from bob"));
    }
}
