//! Shell command - interactive menu over the same services as the CLI

use anyhow::{bail, Context, Result};
use colored::Colorize;
use dialoguer::{Confirm, Input, Select};

use bankbook_core::{BankbookContext, EntryPoint, LogEvent, SessionToken};

use super::account::{self, RegisterArgs};
use super::{
    clear_session, get_context, get_data_dir, get_logger, history, is_interactive, ledger,
    load_session, log_event, log_outcome, services, value_or_prompt,
};
use crate::output;

#[derive(Clone, Copy)]
enum Action {
    Login,
    Register,
    Details,
    Deposit,
    Withdraw,
    Transfer,
    History,
    RequestService,
    Edit,
    Close,
    Logout,
    Quit,
}

impl Action {
    fn label(&self) -> &'static str {
        match self {
            Action::Login => "Log in",
            Action::Register => "Create account",
            Action::Details => "View account details",
            Action::Deposit => "Deposit",
            Action::Withdraw => "Withdraw",
            Action::Transfer => "Transfer",
            Action::History => "Transaction history",
            Action::RequestService => "Request a service",
            Action::Edit => "Edit account",
            Action::Close => "Close account",
            Action::Logout => "Log out",
            Action::Quit => "Quit",
        }
    }

    /// Command name used in the event log
    fn command(&self) -> &'static str {
        match self {
            Action::Login => "login",
            Action::Register => "register",
            Action::Details => "account",
            Action::Deposit => "deposit",
            Action::Withdraw => "withdraw",
            Action::Transfer => "transfer",
            Action::History => "history",
            Action::RequestService => "services_request",
            Action::Edit => "edit",
            Action::Close => "close",
            Action::Logout => "logout",
            Action::Quit => "quit",
        }
    }
}

const LOGGED_OUT: [Action; 3] = [Action::Login, Action::Register, Action::Quit];

const LOGGED_IN: [Action; 10] = [
    Action::Details,
    Action::Deposit,
    Action::Withdraw,
    Action::Transfer,
    Action::History,
    Action::RequestService,
    Action::Edit,
    Action::Close,
    Action::Logout,
    Action::Quit,
];

struct Shell {
    ctx: BankbookContext,
    session: Option<SessionToken>,
}

pub fn run() -> Result<()> {
    if !is_interactive() {
        bail!("The shell needs an interactive terminal");
    }

    let ctx = get_context()?;
    let data_dir = get_data_dir()?;
    // a stale token is treated as logged out
    let session = load_session(&data_dir)
        .ok()
        .flatten()
        .filter(|token| ctx.auth_service.resolve(token).is_ok());

    let logger = get_logger(EntryPoint::Shell);
    log_event(&logger, LogEvent::new("shell_started"));

    let mut shell = Shell { ctx, session };
    println!("{}", "*** Bankbook ***".bold());

    loop {
        let menu: &[Action] = if shell.session.is_some() {
            &LOGGED_IN
        } else {
            &LOGGED_OUT
        };
        let labels: Vec<&str> = menu.iter().map(Action::label).collect();
        let choice = Select::new()
            .with_prompt("What would you like to do?")
            .items(&labels)
            .default(0)
            .interact()?;

        let action = menu[choice];
        if let Action::Quit = action {
            break;
        }

        let result = shell.perform(action);
        if let Err(e) = &result {
            output::error(&format!("{:#}", e));
        }
        log_outcome(&logger, action.command(), &result);
        println!();
    }

    Ok(())
}

impl Shell {
    fn token(&self) -> Result<&SessionToken> {
        self.session.as_ref().context("Not logged in")
    }

    fn perform(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Login => {
                let details = account::login(&self.ctx, None)?;
                self.session = load_session(&get_data_dir()?)?;
                output::success(&format!("Login successful. Welcome, {}.", details.name));
            }
            Action::Register => {
                let details = account::register_account(
                    &self.ctx,
                    RegisterArgs {
                        name: None,
                        username: None,
                        account_type: None,
                        initial_deposit: None,
                        json: false,
                    },
                )?;
                self.session = load_session(&get_data_dir()?)?;
                output::success("Account created successfully!");
                println!("{}", output::account_table(&details));
            }
            Action::Details => {
                let details = self.ctx.account_service.details(self.token()?)?;
                println!("{}", output::account_table(&details));
            }
            Action::Deposit => {
                let amount = ledger::amount_or_prompt(None)?;
                let receipt = self.ctx.ledger_service.deposit(self.token()?, amount)?;
                ledger::print_receipt(&receipt, false)?;
            }
            Action::Withdraw => {
                let amount = ledger::amount_or_prompt(None)?;
                let receipt = self.ctx.ledger_service.withdraw(self.token()?, amount)?;
                ledger::print_receipt(&receipt, false)?;
            }
            Action::Transfer => {
                let recipient = value_or_prompt(None, "Recipient username")?;
                let amount = ledger::amount_or_prompt(None)?;
                let receipt =
                    self.ctx
                        .ledger_service
                        .transfer(self.token()?, &recipient, amount)?;
                ledger::print_receipt(&receipt, false)?;
            }
            Action::History => self.show_history()?,
            Action::RequestService => {
                let kind = services::choose_service(None)?;
                let request = self
                    .ctx
                    .service_request_service
                    .request(self.token()?, kind)?;
                output::success(&format!("{} request submitted.", request.kind.label()));
            }
            Action::Edit => {
                let change = account::prompt_change(&self.ctx)?;
                let details = self.ctx.account_service.edit(self.token()?, change)?;
                output::success("Account updated.");
                println!("{}", output::account_table(&details));
            }
            Action::Close => {
                if Confirm::new()
                    .with_prompt("Permanently close this account?")
                    .default(false)
                    .interact()?
                {
                    let closed = self.ctx.account_service.close(self.token()?)?;
                    self.session = None;
                    clear_session(&get_data_dir()?)?;
                    output::success(&format!("Account '{}' closed.", closed.username));
                }
            }
            Action::Logout => {
                let token = self.token()?.clone();
                self.session = None;
                clear_session(&get_data_dir()?)?;
                self.ctx.auth_service.logout(&token)?;
                output::success("Logged out.");
            }
            Action::Quit => {}
        }
        Ok(())
    }

    fn show_history(&self) -> Result<()> {
        let optional = |prompt: &str| -> Result<Option<String>> {
            let raw: String = Input::new()
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()?;
            let raw = raw.trim().to_string();
            Ok(if raw.is_empty() { None } else { Some(raw) })
        };

        let from = optional("Start date (YYYY-MM-DD, blank for none)")?;
        let to = optional("End date (YYYY-MM-DD, blank for none)")?;
        let kind = optional("Type (deposit/withdrawal/transfer, blank for all)")?;
        let filter = history::build_filter(from.as_deref(), to.as_deref(), kind.as_deref())?;

        let entries = self.ctx.history_service.list(self.token()?, &filter)?;
        if entries.is_empty() {
            output::info("No transactions found.");
        } else {
            println!("{}", "Transaction History:".bold());
            println!("{}", output::history_table(&entries));
        }
        Ok(())
    }
}
