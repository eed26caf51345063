//! Database schema (users, sessions) with version-gated migrations.
//!
//! Each migration checks the recorded version, runs inside a transaction and
//! records the new version in `db_version`, so running migrations on an
//! up-to-date database is a no-op.

use chrono::Utc;
use rusqlite::{params, Connection, Result};

/// Current schema version. Increment this when adding a new migration.
pub const SCHEMA_VERSION: i32 = 1;

pub fn run_migrations(conn: &Connection) -> Result<()> {
  // Bootstrap: ensure db_version table exists (needed to check version)
  conn.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS db_version (
      version INTEGER PRIMARY KEY,
      applied_at TEXT NOT NULL,
      description TEXT
    );
    "#,
  )?;

  let current_version = get_schema_version(conn)?;
  tracing::debug!("schema version: {}", current_version);

  if current_version < 1 {
    migrate_v0_to_v1(conn)?;
  }

  Ok(())
}

/// v0→v1: users and sessions
fn migrate_v0_to_v1(conn: &Connection) -> Result<()> {
  tracing::info!("Running migration v0→v1: Create users and sessions");

  let tx = conn.unchecked_transaction()?;
  tx.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS users (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      username TEXT NOT NULL UNIQUE,
      salt TEXT NOT NULL,
      password_hash TEXT NOT NULL,
      created_at TEXT NOT NULL,
      last_login_at TEXT
    );

    -- No foreign key on user_id: sessions of deleted users resolve as anonymous
    CREATE TABLE IF NOT EXISTS sessions (
      id TEXT PRIMARY KEY,
      user_id INTEGER,
      flash TEXT NOT NULL DEFAULT '{}',
      created_at TEXT NOT NULL,
      expires_at TEXT NOT NULL,
      last_access_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
    CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
    "#,
  )?;
  record_version(&tx, 1, "Create users and sessions")?;
  tx.commit()
}

// ============================================================
// MIGRATION HELPERS
// ============================================================

/// Record a schema version after successful migration
fn record_version(conn: &Connection, version: i32, description: &str) -> Result<()> {
  let now = Utc::now().to_rfc3339();
  conn.execute(
    "INSERT INTO db_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
    params![version, now, description],
  )?;
  tracing::info!("Recorded schema version {} - {}", version, description);
  Ok(())
}

/// Get current schema version (0 if no versions recorded)
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
  conn.query_row(
    "SELECT COALESCE(MAX(version), 0) FROM db_version",
    [],
    |row| row.get(0),
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
    conn
      .prepare(&format!("SELECT {} FROM {} LIMIT 1", column, table))
      .is_ok()
  }

  #[test]
  fn test_migrations_reach_latest_version() {
    let conn = Connection::open_in_memory().unwrap();
    run_migrations(&conn).unwrap();
    assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    assert!(column_exists(&conn, "sessions", "flash"));
    assert!(column_exists(&conn, "users", "salt"));
  }

  #[test]
  fn test_migrations_idempotent() {
    let conn = Connection::open_in_memory().unwrap();
    run_migrations(&conn).unwrap();
    run_migrations(&conn).unwrap();

    let recorded: i64 = conn
      .query_row("SELECT COUNT(*) FROM db_version", [], |row| row.get(0))
      .unwrap();
    assert_eq!(recorded, SCHEMA_VERSION as i64);
  }

  #[test]
  fn test_username_is_unique() {
    let conn = Connection::open_in_memory().unwrap();
    run_migrations(&conn).unwrap();
    let insert = "INSERT INTO users (username, salt, password_hash, created_at) VALUES ('amy', 's', 'h', 'now')";
    conn.execute(insert, []).unwrap();
    assert!(conn.execute(insert, []).is_err());
  }
}
