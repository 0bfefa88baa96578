//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "app": { "rotateSessionOnLogin": false, "defaultAccountType": "Personal" },
//!   "security": { "argon2": { "timeCost": 3, "memoryCost": 65536, ... } }
//! }
//! ```
//! Keys this crate does not manage are preserved on save.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::{AccountType, Argon2Params};

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(default)]
    security: SecuritySettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    rotate_session_on_login: bool,
    #[serde(default)]
    default_account_type: Option<AccountType>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecuritySettings {
    #[serde(default)]
    argon2: Option<Argon2Params>,
}

/// Bankbook configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    /// Issue a fresh session token on every successful login
    pub rotate_session_on_login: bool,
    /// Pre-selected account type when registering interactively
    pub default_account_type: AccountType,
    /// Parameters for hashing newly set passwords
    pub argon2_params: Argon2Params,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rotate_session_on_login: false,
            default_account_type: AccountType::Personal,
            argon2_params: Argon2Params::default(),
        }
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// A missing or malformed settings file yields the defaults. Session
    /// rotation can be forced with `BANKBOOK_ROTATE_SESSION` (for CI/testing).
    pub fn load(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(
                    path = %settings_path.display(),
                    error = %e,
                    "ignoring malformed settings file"
                );
                SettingsFile::default()
            })
        } else {
            SettingsFile::default()
        };

        let rotate_session_on_login =
            match std::env::var("BANKBOOK_ROTATE_SESSION").ok().as_deref() {
                Some("true" | "1" | "yes" | "TRUE" | "YES") => true,
                Some("false" | "0" | "no" | "FALSE" | "NO") => false,
                _ => raw.app.rotate_session_on_login,
            };

        Ok(Self {
            rotate_session_on_login,
            default_account_type: raw.app.default_account_type.unwrap_or(AccountType::Personal),
            argon2_params: raw.security.argon2.unwrap_or_default(),
        })
    }

    /// Save config to the data directory
    /// Preserves other settings that this crate doesn't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join("settings.json");

        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        settings.app.rotate_session_on_login = self.rotate_session_on_login;
        settings.app.default_account_type = Some(self.default_account_type);
        if self.argon2_params != Argon2Params::default() {
            settings.security.argon2 = Some(self.argon2_params.clone());
        }

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.default_account_type, AccountType::Personal);
        assert_eq!(config.argon2_params, Argon2Params::default());
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("settings.json"), "{ not json").unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.default_account_type, AccountType::Personal);
    }

    #[test]
    fn test_save_preserves_unknown_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"app": {"theme": "dark"}, "plugins": {"x": 1}}"#,
        )
        .unwrap();

        let mut config = Config::load(dir.path()).unwrap();
        config.default_account_type = AccountType::Business;
        config.save(dir.path()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["app"]["theme"], "dark");
        assert_eq!(raw["plugins"]["x"], 1);
        assert_eq!(raw["app"]["defaultAccountType"], "Business");

        let reloaded = Config::load(dir.path()).unwrap();
        assert_eq!(reloaded.default_account_type, AccountType::Business);
    }

    #[test]
    fn test_custom_argon2_params_are_loaded() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"security": {"argon2": {
                "timeCost": 1, "memoryCost": 1024, "parallelism": 1, "hashLen": 32
            }}}"#,
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.argon2_params.memory_cost, 1024);
    }
}
