//! Account commands - register, login, logout, show, edit and close

use anyhow::{bail, Context, Result};
use colored::Colorize;
use dialoguer::{Confirm, Select};
use rust_decimal::Decimal;

use bankbook_core::domain::money::parse_decimal;
use bankbook_core::{AccountChange, AccountDetails, AccountType, BankbookContext, NewAccount};

use super::{
    clear_session, get_context, get_data_dir, is_interactive, print_json, prompt_password,
    require_session, save_session, value_or_prompt,
};
use crate::output;

pub struct RegisterArgs {
    pub name: Option<String>,
    pub username: Option<String>,
    pub account_type: Option<String>,
    pub initial_deposit: Option<String>,
    pub json: bool,
}

/// Pick an account type: explicit value, interactive choice, or the configured default
pub fn choose_account_type(value: Option<String>, default: AccountType) -> Result<AccountType> {
    if let Some(v) = value {
        return Ok(v.parse()?);
    }
    if !is_interactive() {
        return Ok(default);
    }
    let options = [AccountType::Personal, AccountType::Business];
    let default_index = options.iter().position(|t| *t == default).unwrap_or(0);
    let choice = Select::new()
        .with_prompt("Account type")
        .items(&options)
        .default(default_index)
        .interact()?;
    Ok(options[choice])
}

/// Collect registration input and create the account
pub fn register_account(ctx: &BankbookContext, args: RegisterArgs) -> Result<AccountDetails> {
    let name = value_or_prompt(args.name, "Full name")?;
    let username = value_or_prompt(args.username, "Username")?;
    let password = prompt_password("Password", true)?;
    let account_type = choose_account_type(args.account_type, ctx.config.default_account_type)?;
    let initial_deposit = match args.initial_deposit {
        Some(raw) => parse_decimal(&raw)?,
        None if is_interactive() => {
            let raw = value_or_prompt(None, "Initial deposit")?;
            parse_decimal(&raw)?
        }
        None => Decimal::ZERO,
    };

    let created = ctx
        .account_service
        .create(NewAccount {
            name,
            username,
            password,
            account_type,
            initial_deposit,
        })
        .context("Registration failed")?;

    save_session(&get_data_dir()?, &created.session_token)?;
    Ok(created.account)
}

pub fn run_register(args: RegisterArgs) -> Result<()> {
    let ctx = get_context()?;
    let json = args.json;
    let details = register_account(&ctx, args)?;

    if json {
        return print_json(&details);
    }
    output::success(&format!("Account '{}' created. You are logged in.", details.username));
    println!("{}", output::account_table(&details));
    Ok(())
}

/// Check credentials and store the resulting session token
pub fn login(ctx: &BankbookContext, username: Option<String>) -> Result<AccountDetails> {
    let username = value_or_prompt(username, "Username")?;
    let password = prompt_password("Password", false)?;

    let token = ctx
        .auth_service
        .authenticate(&username, &password)
        .context("Login failed")?;
    save_session(&get_data_dir()?, &token)?;
    Ok(ctx.account_service.details(&token)?)
}

pub fn run_login(username: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let details = login(&ctx, username)?;

    if json {
        return print_json(&details);
    }
    output::success(&format!("Welcome back, {}.", details.name));
    Ok(())
}

pub fn run_logout(json: bool) -> Result<()> {
    let data_dir = get_data_dir()?;
    let token = require_session()?;
    let ctx = get_context()?;

    let result = ctx.auth_service.logout(&token);
    // the local session is dropped either way
    clear_session(&data_dir)?;
    match result {
        Ok(()) | Err(bankbook_core::Error::InvalidSession) => {}
        Err(e) => return Err(e).context("Logout failed"),
    }

    if json {
        return print_json(serde_json::json!({ "logged_out": true }));
    }
    output::success("Logged out.");
    Ok(())
}

pub fn run_show(json: bool) -> Result<()> {
    let token = require_session()?;
    let ctx = get_context()?;
    let details = ctx.account_service.details(&token)?;

    if json {
        return print_json(&details);
    }
    println!("{}", output::account_table(&details));
    Ok(())
}

pub struct EditArgs {
    pub name: Option<String>,
    pub account_type: Option<String>,
    pub password: bool,
    pub json: bool,
}

/// Ask which field to change when no flag was given
pub fn prompt_change(ctx: &BankbookContext) -> Result<AccountChange> {
    if !is_interactive() {
        bail!("Nothing to change; pass --name, --account-type or --password");
    }
    let fields = ["Name", "Password", "Account type"];
    let choice = Select::new()
        .with_prompt("What would you like to change?")
        .items(&fields)
        .default(0)
        .interact()?;
    Ok(match choice {
        0 => AccountChange::Name(value_or_prompt(None, "New name")?),
        1 => AccountChange::Password(prompt_password("New password", true)?),
        _ => {
            let default = ctx.config.default_account_type;
            AccountChange::AccountType(choose_account_type(None, default)?)
        }
    })
}

pub fn run_edit(args: EditArgs) -> Result<()> {
    let token = require_session()?;
    let ctx = get_context()?;

    let mut changes = Vec::new();
    if let Some(name) = args.name {
        changes.push(AccountChange::Name(name));
    }
    if let Some(account_type) = args.account_type {
        changes.push(AccountChange::AccountType(account_type.parse()?));
    }
    if args.password {
        changes.push(AccountChange::Password(prompt_password("New password", true)?));
    }
    if changes.is_empty() {
        changes.push(prompt_change(&ctx)?);
    }

    let details = ctx
        .account_service
        .edit_many(&token, changes)
        .context("Update failed")?;

    if args.json {
        return print_json(&details);
    }
    output::success("Account updated.");
    println!("{}", output::account_table(&details));
    Ok(())
}

pub fn run_close(force: bool, json: bool) -> Result<()> {
    let data_dir = get_data_dir()?;
    let token = require_session()?;
    let ctx = get_context()?;
    let details = ctx.account_service.details(&token)?;

    if !force {
        if !is_interactive() {
            bail!("Refusing to close the account without --force");
        }
        output::warning(&format!(
            "This will permanently delete '{}' (balance {}).",
            details.username, details.balance
        ));
        println!("{}\n", "Past transactions stay in the log.".dimmed());
        if !Confirm::new()
            .with_prompt("Are you sure?")
            .default(false)
            .interact()?
        {
            println!("{}", "Cancelled".dimmed());
            return Ok(());
        }
    }

    let closed = ctx.account_service.close(&token).context("Close failed")?;
    clear_session(&data_dir)?;

    if json {
        return print_json(&closed);
    }
    output::success(&format!("Account '{}' closed.", closed.username));
    Ok(())
}
