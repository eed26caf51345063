//! Session persistence in the `sessions` table.
//!
//! Expiry is sliding: every save pushes `expires_at` to now + TTL. Expired rows
//! are invisible to [`load`] and removed by [`cleanup_expired`].

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};
use std::collections::BTreeMap;

use super::SessionState;
use crate::db::LogOnError;

/// A live session row
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: String,
    pub state: SessionState,
    pub expires_at: String,
}

/// Fixed-width UTC timestamps so that text comparison orders them correctly
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn flash_json(state: &SessionState) -> String {
    serde_json::to_string(&state.flash).log_warn_default("Failed to encode flash messages")
}

/// Insert a new session expiring `ttl` from now
pub fn create(conn: &Connection, session_id: &str, state: &SessionState, ttl: Duration) -> Result<()> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO sessions (id, user_id, flash, created_at, expires_at, last_access_at) VALUES (?1, ?2, ?3, ?4, ?5, ?4)",
        params![
            session_id,
            state.user_id,
            flash_json(state),
            timestamp(now),
            timestamp(now + ttl)
        ],
    )?;
    Ok(())
}

/// Load a session, None if it does not exist or has expired
pub fn load(conn: &Connection, session_id: &str) -> Result<Option<SessionRecord>> {
    let now = timestamp(Utc::now());
    let row = conn
        .query_row(
            "SELECT id, user_id, flash, expires_at FROM sessions WHERE id = ?1 AND expires_at > ?2",
            params![session_id, now],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<i64>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    Ok(row.map(|(id, user_id, flash, expires_at)| {
        let flash: BTreeMap<String, Vec<String>> =
            serde_json::from_str(&flash).log_warn_default("Discarding unreadable flash messages");
        SessionRecord {
            id,
            state: SessionState { user_id, flash },
            expires_at,
        }
    }))
}

/// Upsert a session and extend its expiry to `ttl` from now
pub fn save(conn: &Connection, session_id: &str, state: &SessionState, ttl: Duration) -> Result<()> {
    let now = Utc::now();
    conn.execute(
        r#"
        INSERT INTO sessions (id, user_id, flash, created_at, expires_at, last_access_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?4)
        ON CONFLICT(id) DO UPDATE SET
            user_id = excluded.user_id,
            flash = excluded.flash,
            expires_at = excluded.expires_at,
            last_access_at = excluded.last_access_at
        "#,
        params![
            session_id,
            state.user_id,
            flash_json(state),
            timestamp(now),
            timestamp(now + ttl)
        ],
    )?;
    Ok(())
}

/// Delete a session (logout)
pub fn destroy(conn: &Connection, session_id: &str) -> Result<()> {
    conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])?;
    Ok(())
}

/// Delete all sessions for a user
pub fn delete_user_sessions(conn: &Connection, user_id: i64) -> Result<usize> {
    let count = conn.execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])?;
    Ok(count)
}

/// Cleanup expired sessions, returns count of deleted sessions
pub fn cleanup_expired(conn: &Connection) -> Result<usize> {
    let now = timestamp(Utc::now());
    let count = conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now])?;
    if count > 0 {
        tracing::debug!("Removed {} expired sessions", count);
    }
    Ok(count)
}
