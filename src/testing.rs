//! Test utilities for database setup.
//!
//! Reuses the authoritative schema initialization so tests never carry their
//! own copy of the schema.

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, MutexGuard};
use tempfile::TempDir;

use crate::auth::{db as auth_db, password};
use crate::config::Config;
use crate::db::{self, DbPool};
use crate::state::AppState;

/// Test environment with a migrated database in a temporary directory.
pub struct TestEnv {
    /// Temporary directory (kept alive for database file persistence)
    pub temp: TempDir,
    pub pool: DbPool,
}

impl TestEnv {
    pub fn new() -> rusqlite::Result<Self> {
        let temp =
            TempDir::new().map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        let pool = db::init_db(&temp.path().join("mytravel.db"))?;
        Ok(Self { temp, pool })
    }

    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.pool.lock().unwrap()
    }

    /// Get the temporary directory path for creating test files.
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Create a user with a real Argon2 hash, returns the user ID.
    pub fn create_user(&self, username: &str, plaintext: &str) -> i64 {
        let hashed = password::hash_password(plaintext).unwrap();
        auth_db::create_user(&self.conn(), username, &hashed.salt, &hashed.hash).unwrap()
    }

    /// Application state over this environment's database, with defaults
    /// and the public directory pointed into the temp dir.
    pub fn state(&self) -> AppState {
        let mut config = Config::resolve(None, |_| None);
        config.database_path = self.path().join("mytravel.db");
        config.public_dir = self.path().join("public");
        AppState::new(Arc::clone(&self.pool), config)
    }
}
