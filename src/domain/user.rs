use serde::Serialize;
use std::fmt;

use crate::auth::password;

/// A stored user account, secret material included.
///
/// Only the authentication strategy and the session layer handle this type.
/// Anything that reaches a view goes through [`User::into_current_user`].
#[derive(Clone)]
pub struct User {
  pub id: i64,
  pub username: String,
  pub salt: String,
  pub password_hash: String,
  pub created_at: String,
  pub last_login_at: Option<String>,
}

impl User {
  /// Check a plaintext password against this record's salt and hash.
  /// A malformed stored hash never matches.
  pub fn validate_password(&self, candidate: &str) -> bool {
    match password::verify_password(candidate, &self.salt, &self.password_hash) {
      Ok(matches) => matches,
      Err(e) => {
        tracing::warn!(user_id = self.id, "Stored credentials unusable: {}", e);
        false
      }
    }
  }

  /// Drop the secret fields, producing the view-safe identity.
  pub fn into_current_user(self) -> CurrentUser {
    CurrentUser {
      id: self.id,
      username: self.username,
      created_at: self.created_at,
      last_login_at: self.last_login_at,
    }
  }
}

impl fmt::Debug for User {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("User")
      .field("id", &self.id)
      .field("username", &self.username)
      .field("salt", &"[redacted]")
      .field("password_hash", &"[redacted]")
      .field("created_at", &self.created_at)
      .field("last_login_at", &self.last_login_at)
      .finish()
  }
}

/// The authenticated user as exposed to handlers and templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
  pub id: i64,
  pub username: String,
  pub created_at: String,
  pub last_login_at: Option<String>,
}

impl CurrentUser {
  /// Date part of `created_at` for display ("2026-10-19")
  pub fn member_since(&self) -> &str {
    self.created_at.get(..10).unwrap_or(&self.created_at)
  }
}
