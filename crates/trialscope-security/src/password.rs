//! Password hashing schemes.
//!
//! `Sha256` is the historical format: lowercase hex SHA-256 of the UTF-8
//! secret, no salt. Existing user tables hold these values, so it stays the
//! default. `Argon2` stores PHC strings (`$argon2id$...`) with a random salt.
//! Verification recognises both formats regardless of the configured scheme.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::{Result, SecurityError};

const ARGON2_PREFIX: &str = "$argon2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordScheme {
    #[default]
    Sha256,
    Argon2,
}

impl PasswordScheme {
    /// Hash `secret` for storage.
    pub fn hash(&self, secret: &str) -> Result<String> {
        match self {
            PasswordScheme::Sha256 => Ok(legacy_sha256(secret)),
            PasswordScheme::Argon2 => {
                let salt = SaltString::generate(&mut rand::rngs::OsRng);
                Argon2::default()
                    .hash_password(secret.as_bytes(), &salt)
                    .map(|h| h.to_string())
                    .map_err(|e| SecurityError::Hashing(e.to_string()))
            }
        }
    }

    /// Scheme that produced `stored`.
    pub fn of_stored(stored: &str) -> Self {
        if stored.starts_with(ARGON2_PREFIX) {
            PasswordScheme::Argon2
        } else {
            PasswordScheme::Sha256
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PasswordScheme::Sha256 => "sha256",
            PasswordScheme::Argon2 => "argon2",
        }
    }
}

/// Unsalted hex SHA-256.
pub fn legacy_sha256(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// Check `secret` against a stored hash of either scheme.
pub fn verify_password(stored: &str, secret: &str) -> bool {
    match PasswordScheme::of_stored(stored) {
        PasswordScheme::Argon2 => match PasswordHash::new(stored) {
            Ok(parsed) => Argon2::default()
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!("Unparseable argon2 hash in credential store: {e}");
                false
            }
        },
        // Stored hex may have been written upper-case by other tools
        PasswordScheme::Sha256 => {
            let stored = stored.to_ascii_lowercase();
            let computed = legacy_sha256(secret);
            stored.as_bytes().ct_eq(computed.as_bytes()).into()
        }
    }
}
