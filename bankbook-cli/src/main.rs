//! Bankbook CLI - account bookkeeping in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use bankbook_core::{EntryPoint, OperationResult};
use commands::account::{EditArgs, RegisterArgs};
use commands::history::HistoryArgs;
use commands::{account, history, ledger, logs, services, settings, shell};

/// Bankbook - deposits, withdrawals and transfers from your terminal
#[derive(Parser)]
#[command(name = "bb", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new account and log in to it
    Register {
        /// Full name
        #[arg(long)]
        name: Option<String>,
        /// Unique username
        #[arg(long)]
        username: Option<String>,
        /// Personal or Business
        #[arg(long)]
        account_type: Option<String>,
        /// Opening balance
        #[arg(long)]
        initial_deposit: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Log in and store the session token
    Login {
        /// Username (prompted if omitted)
        username: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Log out and invalidate the session token
    Logout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show account details
    Account {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change name, password or account type
    Edit {
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New account type (Personal or Business)
        #[arg(long)]
        account_type: Option<String>,
        /// Prompt for a new password
        #[arg(long)]
        password: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Permanently close the account
    Close {
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Deposit funds
    Deposit {
        /// Amount, e.g. 25.50
        amount: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Withdraw funds
    Withdraw {
        /// Amount, e.g. 25.50
        amount: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Transfer funds to another account
    Transfer {
        /// Recipient username
        recipient: Option<String>,
        /// Amount, e.g. 25.50
        amount: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show transaction history
    History {
        /// Start date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        from: Option<String>,
        /// End date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        to: Option<String>,
        /// Only show deposit, withdrawal or transfer
        #[arg(long = "type")]
        kind: Option<String>,
        /// Output format (table, json, csv)
        #[arg(long, default_value = "table")]
        format: String,
        /// Output as JSON (shorthand for --format json)
        #[arg(long)]
        json: bool,
    },

    /// Request and list account services
    Services {
        #[command(subcommand)]
        command: services::ServicesCommands,
    },

    /// Interactive menu
    Shell,

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },

    /// Show or change settings
    Settings {
        /// Issue a new session token on every login
        #[arg(long)]
        rotate_session_on_login: Option<bool>,
        /// Account type pre-selected when registering
        #[arg(long)]
        default_account_type: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    /// Command name used in the event log
    fn name(&self) -> &'static str {
        match self {
            Commands::Register { .. } => "register",
            Commands::Login { .. } => "login",
            Commands::Logout { .. } => "logout",
            Commands::Account { .. } => "account",
            Commands::Edit { .. } => "edit",
            Commands::Close { .. } => "close",
            Commands::Deposit { .. } => "deposit",
            Commands::Withdraw { .. } => "withdraw",
            Commands::Transfer { .. } => "transfer",
            Commands::History { .. } => "history",
            Commands::Services { .. } => "services",
            Commands::Shell => "shell",
            Commands::Logs { .. } => "logs",
            Commands::Settings { .. } => "settings",
        }
    }

    fn wants_json(&self) -> bool {
        match self {
            Commands::Register { json, .. }
            | Commands::Login { json, .. }
            | Commands::Logout { json }
            | Commands::Account { json }
            | Commands::Edit { json, .. }
            | Commands::Close { json, .. }
            | Commands::Deposit { json, .. }
            | Commands::Withdraw { json, .. }
            | Commands::Transfer { json, .. }
            | Commands::Settings { json, .. } => *json,
            Commands::History { json, format, .. } => *json || format == "json",
            Commands::Services { command } => match command {
                services::ServicesCommands::Request { json, .. }
                | services::ServicesCommands::List { json } => *json,
            },
            Commands::Shell | Commands::Logs { .. } => false,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("BANKBOOK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let name = cli.command.name();
    let json = cli.command.wants_json();

    let result = run(cli);

    // the shell logs each menu action itself
    if name != "shell" {
        let logger = commands::get_logger(EntryPoint::Cli);
        commands::log_outcome(&logger, name, &result);
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                let mut context = std::collections::HashMap::new();
                context.insert(
                    "code".to_string(),
                    serde_json::Value::from(commands::error_code(&e)),
                );
                let failure =
                    OperationResult::<()>::fail_with_context(format!("{:#}", e), context);
                match serde_json::to_string_pretty(&failure) {
                    Ok(body) => println!("{}", body),
                    Err(_) => output::error(&format!("{:#}", e)),
                }
            } else {
                output::error(&format!("{:#}", e));
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Register {
            name,
            username,
            account_type,
            initial_deposit,
            json,
        } => account::run_register(RegisterArgs {
            name,
            username,
            account_type,
            initial_deposit,
            json,
        }),
        Commands::Login { username, json } => account::run_login(username, json),
        Commands::Logout { json } => account::run_logout(json),
        Commands::Account { json } => account::run_show(json),
        Commands::Edit { name, account_type, password, json } => {
            account::run_edit(EditArgs { name, account_type, password, json })
        }
        Commands::Close { force, json } => account::run_close(force, json),
        Commands::Deposit { amount, json } => ledger::run_deposit(amount, json),
        Commands::Withdraw { amount, json } => ledger::run_withdraw(amount, json),
        Commands::Transfer {
            recipient,
            amount,
            json,
        } => ledger::run_transfer(recipient, amount, json),
        Commands::History { from, to, kind, format, json } => {
            let format = if json { "json".to_string() } else { format };
            history::run(HistoryArgs { from, to, kind, format })
        }
        Commands::Services { command } => services::run(command),
        Commands::Shell => shell::run(),
        Commands::Logs { command } => logs::run(command),
        Commands::Settings { rotate_session_on_login, default_account_type, json } => {
            settings::run(rotate_session_on_login, default_account_type, json)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_history_json_shorthand() {
        let cli = Cli::try_parse_from(["bb", "history", "--json", "--type", "deposit"]).unwrap();
        assert!(cli.command.wants_json());
        assert_eq!(cli.command.name(), "history");

        let cli = Cli::try_parse_from(["bb", "history", "--format", "csv"]).unwrap();
        assert!(!cli.command.wants_json());
    }

    #[test]
    fn test_transfer_positional_arguments() {
        let cli = Cli::try_parse_from(["bb", "transfer", "bob", "12.50"]).unwrap();
        match cli.command {
            Commands::Transfer { recipient, amount, json } => {
                assert_eq!(recipient.as_deref(), Some("bob"));
                assert_eq!(amount.as_deref(), Some("12.50"));
                assert!(!json);
            }
            _ => panic!("expected transfer"),
        }
    }
}
