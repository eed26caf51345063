//! Credential store: user records in the `users` table.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use crate::domain::User;

const USER_COLUMNS: &str = "id, username, salt, password_hash, created_at, last_login_at";

fn user_from_row(row: &Row<'_>) -> Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        salt: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: row.get(4)?,
        last_login_at: row.get(5)?,
    })
}

/// Create a new user, returns the user ID
pub fn create_user(conn: &Connection, username: &str, salt: &str, password_hash: &str) -> Result<i64> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO users (username, salt, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![username, salt, password_hash, now],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get user by exact username
pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
        params![username],
        user_from_row,
    )
    .optional()
}

/// Get user by ID
pub fn get_user_by_id(conn: &Connection, user_id: i64) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        params![user_id],
        user_from_row,
    )
    .optional()
}

/// Check if a username already exists
pub fn username_exists(conn: &Connection, username: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE username = ?1",
        params![username],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Update user's last login timestamp
pub fn update_last_login(conn: &Connection, user_id: i64) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE users SET last_login_at = ?1 WHERE id = ?2",
        params![now, user_id],
    )?;
    Ok(())
}

/// Delete a user. Returns the username if the user existed.
/// Sessions referencing the user are left alone and resolve as anonymous.
pub fn delete_user(conn: &Connection, user_id: i64) -> Result<Option<String>> {
    let username: Option<String> = conn
        .query_row(
            "SELECT username FROM users WHERE id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?;
    if username.is_some() {
        conn.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
    }
    Ok(username)
}
