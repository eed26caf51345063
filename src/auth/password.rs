//! Password hashing and verification (Argon2id).
//!
//! The salt and the hash output are stored in separate columns. Verification
//! recomputes the hash with the stored salt and compares the outputs; the
//! `Output` comparison is constant-time.

use argon2::{
    password_hash::{rand_core::OsRng, Output, PasswordHasher, SaltString},
    Argon2,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("stored salt is malformed: {0}")]
    InvalidSalt(String),

    #[error("stored hash is malformed: {0}")]
    InvalidHash(String),
}

/// Salt and hash for storage, both B64-encoded.
pub struct HashedPassword {
    pub salt: String,
    pub hash: String,
}

/// Hash a password with a freshly generated salt.
pub fn hash_password(password: &str) -> Result<HashedPassword, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let output = hash_output(password, &salt)?;
    Ok(HashedPassword {
        salt: salt.as_str().to_string(),
        hash: output.to_string(),
    })
}

/// Verify a password against a stored salt and hash.
pub fn verify_password(password: &str, salt: &str, hash: &str) -> Result<bool, PasswordError> {
    let salt = SaltString::from_b64(salt).map_err(|e| PasswordError::InvalidSalt(e.to_string()))?;
    let expected = Output::b64_decode(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;
    let actual = hash_output(password, &salt)?;
    Ok(actual == expected)
}

fn hash_output(password: &str, salt: &SaltString) -> Result<Output, PasswordError> {
    let hashed = Argon2::default()
        .hash_password(password.as_bytes(), salt)
        .map_err(|e| PasswordError::Hashing(e.to_string()))?;
    hashed
        .hash
        .ok_or_else(|| PasswordError::Hashing("argon2 produced no output".to_string()))
}
