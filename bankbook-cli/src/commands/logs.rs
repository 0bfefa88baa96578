//! Logs command - inspect and prune the event log

use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use bankbook_core::{EntryPoint, LogEntry, LogFilter, LoggingService};

use super::{get_data_dir, is_interactive, print_json};
use crate::output;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent events
    List {
        /// Number of events to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Only failed commands
        #[arg(long)]
        failures: bool,
        /// Only events for this command (e.g. transfer)
        #[arg(long)]
        command: Option<String>,
        /// Only failures with this error code (e.g. insufficient_funds)
        #[arg(long)]
        code: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Runs and failures per command and per error code
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete events older than a number of days
    Clear {
        #[arg(long, default_value = "30")]
        older_than_days: i64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },
}

pub fn run(command: LogsCommands) -> Result<()> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    let service = LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))?;

    match command {
        LogsCommands::List {
            limit,
            failures,
            command,
            code,
            json,
        } => {
            let filter = LogFilter {
                failures_only: failures || code.is_some(),
                command,
                error_code: code,
            };
            list(&service, &filter, limit, json)
        }
        LogsCommands::Stats { json } => stats(&service, json),
        LogsCommands::Clear {
            older_than_days,
            force,
        } => clear(&service, older_than_days, force),
    }
}

fn list(service: &LoggingService, filter: &LogFilter, limit: usize, json: bool) -> Result<()> {
    let entries = service.query(filter, limit)?;
    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        output::info("No matching events.");
        return Ok(());
    }
    println!("{}", entries_table(&entries));
    Ok(())
}

fn entries_table(entries: &[LogEntry]) -> comfy_table::Table {
    let mut table = output::create_table();
    table.set_header(vec!["Time", "From", "Command", "Outcome"]);
    for entry in entries {
        let outcome = match (&entry.error_code, &entry.error_message) {
            (Some(code), Some(message)) => format!("{} ({})", message, code).red().to_string(),
            (Some(code), None) => code.red().to_string(),
            _ => entry.event.clone(),
        };
        table.add_row(vec![
            format_timestamp(entry.timestamp),
            entry.entry_point.clone(),
            entry.command.clone().unwrap_or_else(|| "-".to_string()),
            outcome,
        ]);
    }
    table
}

fn stats(service: &LoggingService, json: bool) -> Result<()> {
    let total = service.count()?;
    let failed = service.error_count()?;
    let per_command = service.command_stats()?;
    let per_code = service.failures_by_code()?;

    if json {
        let by_code: serde_json::Map<String, serde_json::Value> = per_code
            .into_iter()
            .map(|(code, count)| (code, count.into()))
            .collect();
        return print_json(serde_json::json!({
            "events": total,
            "failures": failed,
            "commands": per_command,
            "failures_by_code": by_code,
            "database_path": service.db_path().to_string_lossy(),
        }));
    }

    println!("{} events, {} failed", total, failed);
    println!("{}", service.db_path().display().to_string().dimmed());

    if !per_command.is_empty() {
        let mut table = output::create_table();
        table.set_header(vec!["Command", "Runs", "Failed"]);
        for row in &per_command {
            table.add_row(vec![
                row.command.clone(),
                row.runs.to_string(),
                row.failures.to_string(),
            ]);
        }
        println!("{}", table);
    }

    if !per_code.is_empty() {
        let mut table = output::create_table();
        table.set_header(vec!["Error code", "Count"]);
        for (code, count) in &per_code {
            table.add_row(vec![code.clone(), count.to_string()]);
        }
        println!("{}", table);
    }
    Ok(())
}

fn clear(service: &LoggingService, older_than_days: i64, force: bool) -> Result<()> {
    let days = older_than_days.max(0);
    if !force {
        if !is_interactive() {
            anyhow::bail!("Refusing to delete events without --force");
        }
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete events older than {} days?", days))
            .default(false)
            .interact()?;
        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let cutoff = (Utc::now() - Duration::days(days)).timestamp_millis();
    let deleted = service.delete_before(cutoff)?;
    output::success(&format!("Deleted {} events.", deleted));
    Ok(())
}

fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00");
        assert_eq!(format_timestamp(1_700_000_000_000), "2023-11-14 22:13:20");
    }

    #[test]
    fn test_failure_rows_show_code() {
        let entry = LogEntry {
            id: 1,
            timestamp: 0,
            entry_point: "shell".to_string(),
            app_version: "0.1.0".to_string(),
            platform: "linux".to_string(),
            event: "withdraw_failed".to_string(),
            command: Some("withdraw".to_string()),
            error_code: Some("insufficient_funds".to_string()),
            error_message: Some("Insufficient balance".to_string()),
        };
        let rendered = entries_table(&[entry]).to_string();
        assert!(rendered.contains("insufficient_funds"));
        assert!(rendered.contains("withdraw"));
    }
}
