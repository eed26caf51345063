//! Shared setup for pipeline tests: a router over a throwaway database and
//! public directory.

#![allow(dead_code)]

use axum_test::{TestResponse, TestServer};
use rusqlite::Connection;
use std::sync::{Arc, MutexGuard};
use tempfile::TempDir;

use my_travel::auth::{db as auth_db, password};
use my_travel::config::{Config, Environment};
use my_travel::db::{self, DbPool};
use my_travel::state::AppState;
use my_travel::{app, session};

pub const COOKIE: &str = session::SESSION_COOKIE_NAME;
pub const STYLESHEET: &str = "body { color: black; }";

pub struct TestApp {
  pub server: TestServer,
  pub state: AppState,
  pub pool: DbPool,
  _temp: TempDir,
}

impl TestApp {
  pub fn new() -> Self {
    Self::with_environment(Environment::Development)
  }

  pub fn with_environment(environment: Environment) -> Self {
    let temp = TempDir::new().unwrap();
    let public = temp.path().join("public");
    std::fs::create_dir_all(public.join("stylesheets")).unwrap();
    std::fs::write(public.join("stylesheets").join("style.css"), STYLESHEET).unwrap();

    let database_path = temp.path().join("mytravel.db");
    let pool = db::init_db(&database_path).unwrap();

    let mut config = Config::resolve(None, |_| None);
    config.database_path = database_path;
    config.public_dir = public;
    config.environment = environment;
    let state = AppState::new(Arc::clone(&pool), config);

    let server = Self::client(&state, true);
    TestApp {
      server,
      state,
      pool,
      _temp: temp,
    }
  }

  fn client(state: &AppState, save_cookies: bool) -> TestServer {
    let mut server = TestServer::new(app::router(state.clone())).unwrap();
    if save_cookies {
      server.save_cookies();
    }
    server
  }

  /// A second client over the same state that keeps no cookies
  pub fn cookieless_client(&self) -> TestServer {
    Self::client(&self.state, false)
  }

  pub fn conn(&self) -> MutexGuard<'_, Connection> {
    self.pool.lock().unwrap()
  }

  pub fn create_user(&self, username: &str, plaintext: &str) -> i64 {
    let hashed = password::hash_password(plaintext).unwrap();
    auth_db::create_user(&self.conn(), username, &hashed.salt, &hashed.hash).unwrap()
  }

  pub async fn login(&self, username: &str, plaintext: &str) -> TestResponse {
    self
      .server
      .post("/login")
      .form(&[("username", username), ("password", plaintext)])
      .await
  }

  /// Number of sessions bound to some user
  pub fn authenticated_sessions(&self) -> i64 {
    self
      .conn()
      .query_row("SELECT COUNT(*) FROM sessions WHERE user_id IS NOT NULL", [], |row| row.get(0))
      .unwrap()
  }
}

pub fn location(response: &TestResponse) -> String {
  response.header("location").to_str().unwrap().to_string()
}
