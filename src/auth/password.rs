//! Password hashing for seeded accounts using Argon2
//!
//! Uses the argon2id variant. `HashCost::Light` trades strength for speed and
//! is meant for throwaway development datasets and tests.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::types::{Result, SeedError};

/// Argon2 cost profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashCost {
    /// Library defaults
    #[default]
    Standard,
    /// 8 MiB memory, single pass
    Light,
}

fn hasher(cost: HashCost) -> Result<Argon2<'static>> {
    match cost {
        HashCost::Standard => Ok(Argon2::default()),
        HashCost::Light => {
            let params = Params::new(8 * 1024, 1, 1, None)
                .map_err(|e| SeedError::Auth(format!("Invalid Argon2 parameters: {e}")))?;
            Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
        }
    }
}

/// Hash a password, returning the PHC-formatted string
pub fn hash_password(password: &str, cost: HashCost) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    hasher(cost)?
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| SeedError::Auth(format!("Failed to hash password: {e}")))
}

/// Verify a password against a stored hash
///
/// Parameters are read from the hash itself, so both cost profiles verify.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| SeedError::Auth(format!("Invalid password hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
