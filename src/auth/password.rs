use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use tracing::error;

use crate::config::PasswordScheme;

pub fn hash_password(scheme: PasswordScheme, plain: &str) -> anyhow::Result<String> {
    match scheme {
        PasswordScheme::Argon2 => {
            let salt = SaltString::generate(&mut OsRng);
            let hash = Argon2::default()
                .hash_password(plain.as_bytes(), &salt)
                .map_err(|e| {
                    error!(error = %e, "argon2 hash_password error");
                    anyhow::anyhow!(e.to_string())
                })?
                .to_string();
            Ok(hash)
        }
        PasswordScheme::Sha256 => Ok(sha256_hex(plain)),
    }
}

/// Checks `plain` against a stored hash of either scheme. PHC strings
/// (`$argon2id$...`) go through argon2, anything else is a SHA-256 hex digest.
pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    if !hash.starts_with('$') {
        return Ok(sha256_hex(plain) == hash);
    }
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

fn sha256_hex(plain: &str) -> String {
    format!("{:x}", Sha256::digest(plain.as_bytes()))
}
