//! Ledger commands - deposit, withdraw and transfer

use anyhow::{Context, Result};
use colored::Colorize;

use bankbook_core::domain::money::format_money;
use bankbook_core::services::LedgerReceipt;
use bankbook_core::Amount;

use super::{get_context, print_json, require_session, value_or_prompt};

/// Parse an amount argument, prompting when it is missing
pub fn amount_or_prompt(value: Option<String>) -> Result<Amount> {
    let raw = value_or_prompt(value, "Amount")?;
    Ok(raw.parse::<Amount>()?)
}

pub fn print_receipt(receipt: &LedgerReceipt, json: bool) -> Result<()> {
    if json {
        return print_json(receipt);
    }
    let tx = &receipt.transaction;
    let what = match tx.counterparty.as_deref() {
        Some(to) => format!("{} of {} to {}", tx.kind, tx.amount, to),
        None => format!("{} of {}", tx.kind, tx.amount),
    };
    println!("{} {}", "✓".green(), what);
    println!("  New balance: {}", format_money(receipt.balance).bold());
    Ok(())
}

pub fn run_deposit(amount: Option<String>, json: bool) -> Result<()> {
    let token = require_session()?;
    let ctx = get_context()?;
    let amount = amount_or_prompt(amount)?;
    let receipt = ctx
        .ledger_service
        .deposit(&token, amount)
        .context("Deposit failed")?;
    print_receipt(&receipt, json)
}

pub fn run_withdraw(amount: Option<String>, json: bool) -> Result<()> {
    let token = require_session()?;
    let ctx = get_context()?;
    let amount = amount_or_prompt(amount)?;
    let receipt = ctx
        .ledger_service
        .withdraw(&token, amount)
        .context("Withdrawal failed")?;
    print_receipt(&receipt, json)
}

pub fn run_transfer(recipient: Option<String>, amount: Option<String>, json: bool) -> Result<()> {
    let token = require_session()?;
    let ctx = get_context()?;
    let recipient = value_or_prompt(recipient, "Recipient username")?;
    let amount = amount_or_prompt(amount)?;
    let receipt = ctx
        .ledger_service
        .transfer(&token, &recipient, amount)
        .context("Transfer failed")?;
    print_receipt(&receipt, json)
}
