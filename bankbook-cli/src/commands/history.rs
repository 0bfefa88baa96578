//! History command - list or export transactions

use std::io;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;

use bankbook_core::{TransactionFilter, TransactionKind};

use super::{get_context, print_json, require_session};
use crate::output;

pub struct HistoryArgs {
    pub from: Option<String>,
    pub to: Option<String>,
    pub kind: Option<String>,
    pub format: String,
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", raw))
}

pub fn build_filter(
    from: Option<&str>,
    to: Option<&str>,
    kind: Option<&str>,
) -> Result<TransactionFilter> {
    Ok(TransactionFilter {
        start_date: from.map(parse_date).transpose()?,
        end_date: to.map(parse_date).transpose()?,
        kind: kind.map(str::parse::<TransactionKind>).transpose()?,
    })
}

pub fn run(args: HistoryArgs) -> Result<()> {
    let filter = build_filter(args.from.as_deref(), args.to.as_deref(), args.kind.as_deref())?;
    let token = require_session()?;
    let ctx = get_context()?;

    match args.format.as_str() {
        "csv" => {
            let stdout = io::stdout();
            ctx.history_service
                .export_csv(&token, &filter, stdout.lock())
                .context("Export failed")?;
        }
        "json" => {
            let entries = ctx.history_service.list(&token, &filter)?;
            print_json(&entries)?;
        }
        "table" => {
            let entries = ctx.history_service.list(&token, &filter)?;
            if entries.is_empty() {
                output::info("No transactions found.");
            } else {
                println!("{}", output::history_table(&entries));
            }
        }
        other => bail!("Unknown format '{}' (expected table, json or csv)", other),
    }
    Ok(())
}
