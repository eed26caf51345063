//! Username/password strategy used at login time.

use rusqlite::Connection;
use thiserror::Error;

use super::db as auth_db;
use crate::domain::User;

#[derive(Debug, Error)]
pub enum AuthError {
    /// No user with that username
    #[error("Incorrect username.")]
    NotFound,

    /// Password does not match the stored hash
    #[error("Incorrect password.")]
    InvalidCredentials,

    #[error("Credential lookup failed: {0}")]
    Lookup(#[from] rusqlite::Error),
}

/// Verify a username and password.
///
/// Returns the full record, secrets included; callers must not hand it to a
/// view. There is no lockout or backoff on repeated failures.
pub fn verify(conn: &Connection, username: &str, password: &str) -> Result<User, AuthError> {
    let user = find_user(conn, username)?;
    check_password(user, password)
}

/// Lookup half of [`verify`]; the only part that needs the connection.
pub fn find_user(conn: &Connection, username: &str) -> Result<User, AuthError> {
    auth_db::get_user_by_username(conn, username)?.ok_or(AuthError::NotFound)
}

/// Hashing half of [`verify`]. Run it without holding the database lock.
pub fn check_password(user: User, password: &str) -> Result<User, AuthError> {
    if !user.validate_password(password) {
        return Err(AuthError::InvalidCredentials);
    }
    Ok(user)
}
