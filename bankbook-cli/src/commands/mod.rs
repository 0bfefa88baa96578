//! CLI command implementations

pub mod account;
pub mod history;
pub mod ledger;
pub mod logs;
pub mod services;
pub mod settings;
pub mod shell;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use dialoguer::{Input, Password};
use serde::Serialize;

use bankbook_core::{
    BankbookContext, EntryPoint, LogEvent, LoggingService, OperationResult, SessionToken,
};

/// File inside the data directory holding the current session token
const SESSION_FILE: &str = "session";

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger(entry_point: EntryPoint) -> Option<LoggingService> {
    let data_dir = get_data_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, entry_point, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        if let Err(e) = l.log(event) {
            tracing::debug!(error = %e, "event log write failed");
        }
    }
}

/// Record the outcome of a command in the event log
///
/// Failures are logged by error code only.
pub fn log_outcome(logger: &Option<LoggingService>, command: &str, result: &Result<()>) {
    if let Some(l) = logger {
        let written = match result {
            Ok(()) => l.log_command(command),
            Err(e) => l.log_failure(command, error_code(e)),
        };
        if let Err(e) = written {
            tracing::debug!(error = %e, "event log write failed");
        }
    }
}

/// Stable code for an error chain, `cli` when it did not come from the core
pub fn error_code(err: &anyhow::Error) -> &'static str {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<bankbook_core::Error>())
        .map(|e| e.code())
        .unwrap_or("cli")
}

/// Get the data directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("BANKBOOK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".bankbook"))
        .context("Could not find home directory; set BANKBOOK_DIR")
}

/// Open the ledger in the data directory
pub fn get_context() -> Result<BankbookContext> {
    let data_dir = get_data_dir()?;
    BankbookContext::new(&data_dir).context("Failed to open bankbook database")
}

// === Session file ===

/// Persist the session token, readable only by the owner on unix
pub fn save_session(data_dir: &Path, token: &SessionToken) -> Result<()> {
    fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;
    let path = data_dir.join(SESSION_FILE);

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    // mode() only applies on create
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(token.as_str().as_bytes())?;
    Ok(())
}

/// Read the saved session token, if any
pub fn load_session(data_dir: &Path) -> Result<Option<SessionToken>> {
    let path = data_dir.join(SESSION_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Some(SessionToken::parse(&raw)?))
}

pub fn clear_session(data_dir: &Path) -> Result<()> {
    let path = data_dir.join(SESSION_FILE);
    if path.exists() {
        fs::remove_file(&path)?;
    }
    Ok(())
}

/// The saved token, or an error telling the user to log in
pub fn require_session() -> Result<SessionToken> {
    match load_session(&get_data_dir()?)? {
        Some(token) => Ok(token),
        None => bail!("Not logged in. Run `bb login` or `bb register` first."),
    }
}

// === Prompts ===

pub fn is_interactive() -> bool {
    atty::is(atty::Stream::Stdin)
}

/// Use the given value or prompt for it when stdin is a terminal
pub fn value_or_prompt(value: Option<String>, prompt: &str) -> Result<String> {
    if let Some(v) = value {
        return Ok(v);
    }
    if !is_interactive() {
        bail!("Missing {}; pass it as an argument", prompt.to_lowercase());
    }
    Ok(Input::<String>::new().with_prompt(prompt).interact_text()?)
}

/// Hidden password prompt; passwords are never taken from arguments
pub fn prompt_password(prompt: &str, confirm: bool) -> Result<String> {
    if !is_interactive() {
        bail!("A password prompt needs an interactive terminal");
    }
    let mut password = Password::new().with_prompt(prompt);
    if confirm {
        password = password.with_confirmation("Confirm password", "Passwords do not match");
    }
    Ok(password.interact()?)
}

/// Print a value wrapped in a successful `OperationResult`
pub fn print_json<T: Serialize>(data: T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&OperationResult::ok(data))?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bankbook_core::LogFilter;
    use tempfile::tempdir;

    #[test]
    fn test_session_file_round_trip() {
        let dir = tempdir().unwrap();
        assert!(load_session(dir.path()).unwrap().is_none());

        let token = SessionToken::generate();
        save_session(dir.path(), &token).unwrap();
        assert_eq!(load_session(dir.path()).unwrap(), Some(token));

        clear_session(dir.path()).unwrap();
        assert!(load_session(dir.path()).unwrap().is_none());
        // clearing twice is fine
        clear_session(dir.path()).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_session_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        save_session(dir.path(), &SessionToken::generate()).unwrap();
        let mode = fs::metadata(dir.path().join(SESSION_FILE))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_session_file_is_made_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join(SESSION_FILE);
        fs::write(&path, "stale").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let token = SessionToken::generate();
        save_session(dir.path(), &token).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(load_session(dir.path()).unwrap(), Some(token));
    }

    #[test]
    fn test_corrupt_session_file_is_rejected() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(SESSION_FILE), "not-a-token").unwrap();
        assert!(load_session(dir.path()).is_err());
    }

    #[test]
    fn test_error_code_finds_core_error() {
        let err = anyhow::Error::from(bankbook_core::Error::InsufficientFunds)
            .context("Withdrawal failed");
        assert_eq!(error_code(&err), "insufficient_funds");
        assert_eq!(error_code(&anyhow::anyhow!("plain")), "cli");
    }

    #[test]
    fn test_failed_command_logs_no_account_data() {
        let dir = tempdir().unwrap();
        let logger = Some(LoggingService::new(dir.path(), EntryPoint::Shell, "test").unwrap());

        let result: Result<()> =
            Err(bankbook_core::Error::UnknownRecipient("bob_secret".to_string()).into());
        log_outcome(&logger, "transfer", &result);

        let result: Result<()> = Err(anyhow::anyhow!("Failed to write /home/bob_secret/session"));
        log_outcome(&logger, "login", &result);
        log_outcome(&logger, "deposit", &Ok(()));

        let service = logger.unwrap();
        let entries = service.query(&LogFilter::default(), 10).unwrap();
        assert_eq!(entries.len(), 3);
        for entry in &entries {
            let message = entry.error_message.as_deref().unwrap_or_default();
            assert!(!message.contains("bob_secret"), "leaked: {}", message);
        }

        let failures = LogFilter {
            failures_only: true,
            ..LogFilter::default()
        };
        let errors = service.query(&failures, 10).unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].error_code.as_deref(), Some("cli"));
        assert_eq!(errors[1].event, "transfer_failed");
        assert_eq!(errors[1].error_code.as_deref(), Some("unknown_recipient"));
        assert_eq!(errors[1].error_message.as_deref(), Some("Unknown recipient"));
    }
}
