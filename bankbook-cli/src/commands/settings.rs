//! Settings command - show and change settings.json

use anyhow::Result;
use colored::Colorize;

use bankbook_core::config::Config;
use bankbook_core::AccountType;

use super::{get_data_dir, print_json};
use crate::output;

pub fn run(
    rotate_session_on_login: Option<bool>,
    default_account_type: Option<String>,
    json: bool,
) -> Result<()> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    let mut config = Config::load(&data_dir)?;

    let mut changed = false;
    if let Some(rotate) = rotate_session_on_login {
        config.rotate_session_on_login = rotate;
        changed = true;
    }
    if let Some(raw) = default_account_type {
        config.default_account_type = raw.parse::<AccountType>()?;
        changed = true;
    }
    if changed {
        config.save(&data_dir)?;
    }

    let params = &config.argon2_params;
    if json {
        return print_json(serde_json::json!({
            "rotateSessionOnLogin": config.rotate_session_on_login,
            "defaultAccountType": config.default_account_type,
            "argon2": params,
            "dataDir": data_dir.to_string_lossy(),
        }));
    }

    if changed {
        output::success("Settings saved.");
    }
    println!("{}", "Settings".bold());
    let mut table = output::create_table();
    table.add_row(vec![
        "Rotate session on login".to_string(),
        config.rotate_session_on_login.to_string(),
    ]);
    table.add_row(vec![
        "Default account type".to_string(),
        config.default_account_type.to_string(),
    ]);
    table.add_row(vec![
        "Argon2 (t, m KiB, p)".to_string(),
        format!("{}, {}, {}", params.time_cost, params.memory_cost, params.parallelism),
    ]);
    table.add_row(vec!["Data directory".to_string(), data_dir.display().to_string()]);
    println!("{}", table);
    Ok(())
}
