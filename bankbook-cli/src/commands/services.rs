//! Services command - request checkbooks, cards and other account services

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use dialoguer::Select;

use bankbook_core::ServiceKind;

use super::{get_context, is_interactive, print_json, require_session};
use crate::output;

#[derive(Subcommand)]
pub enum ServicesCommands {
    /// Request a service (checkbook, card, recurring-payments, direct-debits)
    Request {
        /// Service to request
        service: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List submitted requests
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Parse a service name or let the user pick one
pub fn choose_service(value: Option<String>) -> Result<ServiceKind> {
    if let Some(v) = value {
        return Ok(v.parse()?);
    }
    if !is_interactive() {
        bail!(
            "Missing service; expected one of checkbook, card, recurring-payments, direct-debits"
        );
    }
    let choice = Select::new()
        .with_prompt("Which service?")
        .items(&ServiceKind::ALL)
        .default(0)
        .interact()?;
    Ok(ServiceKind::ALL[choice])
}

pub fn run(command: ServicesCommands) -> Result<()> {
    let token = require_session()?;
    let ctx = get_context()?;

    match command {
        ServicesCommands::Request { service, json } => {
            let kind = choose_service(service)?;
            let request = ctx
                .service_request_service
                .request(&token, kind)
                .context("Service request failed")?;
            if json {
                return print_json(&request);
            }
            output::success(&format!("{} requested.", request.kind.label()));
        }
        ServicesCommands::List { json } => {
            let requests = ctx.service_request_service.list(&token)?;
            if json {
                return print_json(&requests);
            }
            if requests.is_empty() {
                output::info("No service requests yet.");
            } else {
                println!("{}", output::service_requests_table(&requests));
            }
        }
    }
    Ok(())
}
