//! Passwords and session tokens

use std::fmt;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Version};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Default Argon2id parameters
pub const DEFAULT_TIME_COST: u32 = 3;
pub const DEFAULT_MEMORY_COST: u32 = 65536; // 64 MiB
pub const DEFAULT_PARALLELISM: u32 = 4;
pub const DEFAULT_HASH_LEN: u32 = 32;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Random bytes behind a session token (hex encoded, so 32 chars)
const TOKEN_BYTES: usize = 16;

/// Argon2id parameters used when hashing new passwords
///
/// Verification always uses the parameters embedded in the stored hash,
/// so changing these only affects passwords set afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Argon2Params {
    pub time_cost: u32,
    pub memory_cost: u32,
    pub parallelism: u32,
    pub hash_len: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            time_cost: DEFAULT_TIME_COST,
            memory_cost: DEFAULT_MEMORY_COST,
            parallelism: DEFAULT_PARALLELISM,
            hash_len: DEFAULT_HASH_LEN,
        }
    }
}

impl Argon2Params {
    fn hasher(&self) -> Result<Argon2<'static>> {
        let params = argon2::Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            Some(self.hash_len as usize),
        )
        .map_err(|e| Error::Config(format!("invalid argon2 params: {}", e)))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Check the password policy: length, a digit and an uppercase letter
pub fn validate_password_strength(password: &str) -> Result<()> {
    let long_enough = password.chars().count() >= MIN_PASSWORD_LEN;
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_upper = password.chars().any(char::is_uppercase);

    if !(long_enough && has_digit && has_upper) {
        return Err(Error::invalid_input(format!(
            "password must be at least {} characters long and contain a digit \
             and an uppercase letter",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Hash a password into a PHC string (`$argon2id$v=19$...`)
pub fn hash_password(password: &str, params: &Argon2Params) -> Result<String> {
    let salt_bytes: [u8; 16] = rand::thread_rng().gen();
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| Error::Config(format!("failed to encode salt: {}", e)))?;

    let hash = params
        .hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Config(format!("failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

/// Compare a password against a stored PHC string
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|_| Error::store("stored password hash is corrupt"))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Opaque bearer credential bound to one account
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generate a fresh random token
    pub fn generate() -> Self {
        let bytes: [u8; TOKEN_BYTES] = rand::thread_rng().gen();
        Self(hex::encode(bytes))
    }

    /// Parse a token read from a session file or the database
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let well_formed = raw.len() == TOKEN_BYTES * 2
            && raw.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if !well_formed {
            return Err(Error::InvalidSession);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_params() -> Argon2Params {
        Argon2Params {
            time_cost: 1,
            memory_cost: 1024,
            parallelism: 1,
            hash_len: 32,
        }
    }

    #[test]
    fn test_password_strength() {
        assert!(validate_password_strength("short1").is_err());
        assert!(validate_password_strength("longenough1").is_err()); // no uppercase
        assert!(validate_password_strength("LongEnough").is_err()); // no digit
        assert!(validate_password_strength("Passw0rd").is_ok());
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("Passw0rd", &fast_params()).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Passw0rd", &hash).unwrap());
        assert!(!verify_password("passw0rd", &hash).unwrap());
    }

    #[test]
    fn test_same_password_gets_distinct_hashes() {
        let a = hash_password("Passw0rd", &fast_params()).unwrap();
        let b = hash_password("Passw0rd", &fast_params()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_corrupt_hash_is_a_store_error() {
        let err = verify_password("Passw0rd", "not-a-hash").unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable(_)));
    }

    #[test]
    fn test_token_format() {
        let token = SessionToken::generate();
        assert_eq!(token.as_str().len(), 32);
        assert_eq!(SessionToken::parse(token.as_str()).unwrap(), token);
        assert_ne!(SessionToken::generate(), token);
    }

    #[test]
    fn test_token_parse_rejects_malformed() {
        assert!(SessionToken::parse("").is_err());
        assert!(SessionToken::parse("XYZ").is_err());
        assert!(SessionToken::parse(&"G".repeat(32)).is_err());
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = SessionToken::generate();
        assert!(!format!("{:?}", token).contains(token.as_str()));
    }
}
