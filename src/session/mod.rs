//! Cookie-keyed sessions persisted in the database.
//!
//! A [`Session`] handle is placed in the request extensions by
//! [`middleware::load_session`]. Handlers mutate it through the handle; the
//! middleware persists the result once the response is produced.

pub mod middleware;
pub mod store;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::AppError;

pub use middleware::SESSION_COOKIE_NAME;

/// Flash category for failures shown to the user
pub const FLASH_ERROR: &str = "error";

/// Flash category for confirmations
pub const FLASH_INFO: &str = "info";

/// Persisted session state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
  /// Authenticated user, None for anonymous sessions
  pub user_id: Option<i64>,
  /// Pending flash messages by category, cleared when read
  pub flash: BTreeMap<String, Vec<String>>,
}

/// A single flash message ready for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashMessage {
  pub kind: String,
  pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
  Active,
  /// Issue a fresh id on commit (login)
  Regenerate,
  /// Delete the record and clear the cookie on commit (logout)
  Destroyed,
}

struct Inner {
  id: String,
  state: SessionState,
  is_new: bool,
  lifecycle: Lifecycle,
}

/// Point-in-time copy of a session, used when committing it
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
  pub id: String,
  pub state: SessionState,
  pub is_new: bool,
  pub lifecycle: Lifecycle,
}

/// Request-scoped session handle. Clones share the same state.
#[derive(Clone)]
pub struct Session {
  inner: Arc<Mutex<Inner>>,
}

impl Session {
  /// A session that has no record yet
  pub fn fresh() -> Self {
    Self::with(generate_session_id(), SessionState::default(), true)
  }

  /// A session loaded from the store
  pub fn existing(id: String, state: SessionState) -> Self {
    Self::with(id, state, false)
  }

  fn with(id: String, state: SessionState, is_new: bool) -> Self {
    Session {
      inner: Arc::new(Mutex::new(Inner {
        id,
        state,
        is_new,
        lifecycle: Lifecycle::Active,
      })),
    }
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn id(&self) -> String {
    self.lock().id.clone()
  }

  pub fn is_new(&self) -> bool {
    self.lock().is_new
  }

  pub fn user_id(&self) -> Option<i64> {
    let inner = self.lock();
    match inner.lifecycle {
      Lifecycle::Destroyed => None,
      _ => inner.state.user_id,
    }
  }

  /// Bind the session to a user. The session id is regenerated on commit.
  pub fn log_in(&self, user_id: i64) {
    let mut inner = self.lock();
    inner.state.user_id = Some(user_id);
    inner.lifecycle = Lifecycle::Regenerate;
  }

  /// Forget the user but keep the session (e.g. the user no longer exists)
  pub fn clear_user(&self) {
    self.lock().state.user_id = None;
  }

  /// Delete the session entirely (logout)
  pub fn destroy(&self) {
    let mut inner = self.lock();
    inner.state = SessionState::default();
    inner.lifecycle = Lifecycle::Destroyed;
  }

  /// Queue a message for the next rendered page
  pub fn flash(&self, kind: &str, text: impl Into<String>) {
    self
      .lock()
      .state
      .flash
      .entry(kind.to_string())
      .or_default()
      .push(text.into());
  }

  /// Remove and return every pending flash message
  pub fn take_flash(&self) -> Vec<FlashMessage> {
    let flash = std::mem::take(&mut self.lock().state.flash);
    flash
      .into_iter()
      .flat_map(|(kind, texts)| {
        texts.into_iter().map(move |text| FlashMessage {
          kind: kind.clone(),
          text,
        })
      })
      .collect()
  }

  pub fn snapshot(&self) -> SessionSnapshot {
    let inner = self.lock();
    SessionSnapshot {
      id: inner.id.clone(),
      state: inner.state.clone(),
      is_new: inner.is_new,
      lifecycle: inner.lifecycle,
    }
  }
}

impl<S: Send + Sync> FromRequestParts<S> for Session {
  type Rejection = AppError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<Session>()
      .cloned()
      .ok_or_else(|| AppError::Internal("session layer is not installed".to_string()))
  }
}

/// Generate a new session ID
pub fn generate_session_id() -> String {
  use rand::Rng;
  let mut rng = rand::rng();
  (0..32)
    .map(|_| {
      let idx = rng.random_range(0..36);
      if idx < 10 {
        (b'0' + idx) as char
      } else {
        (b'a' + idx - 10) as char
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_generate_session_id() {
    let id = generate_session_id();
    assert_eq!(id.len(), 32);
    assert!(id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    assert_ne!(id, generate_session_id());
  }

  #[test]
  fn test_flash_is_single_read() {
    let session = Session::fresh();
    session.flash(FLASH_ERROR, "Incorrect username or password.");
    session.flash(FLASH_INFO, "Welcome back");

    let messages = session.take_flash();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].kind, "error");
    assert_eq!(messages[1].text, "Welcome back");

    assert!(session.take_flash().is_empty());
  }

  #[test]
  fn test_log_in_marks_regeneration() {
    let session = Session::existing("abc".into(), SessionState::default());
    session.log_in(7);

    let snapshot = session.snapshot();
    assert_eq!(snapshot.state.user_id, Some(7));
    assert_eq!(snapshot.lifecycle, Lifecycle::Regenerate);
    assert_eq!(session.user_id(), Some(7));
  }

  #[test]
  fn test_destroy_forgets_user() {
    let session = Session::existing(
      "abc".into(),
      SessionState {
        user_id: Some(3),
        ..Default::default()
      },
    );
    session.destroy();

    assert_eq!(session.user_id(), None);
    assert_eq!(session.snapshot().lifecycle, Lifecycle::Destroyed);
  }

  #[test]
  fn test_clones_share_state() {
    let session = Session::fresh();
    let other = session.clone();
    other.flash(FLASH_INFO, "hi");
    assert_eq!(session.take_flash().len(), 1);
    assert!(session.is_new());
  }
}
