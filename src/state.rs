//! Application state shared by every request.

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};
use std::sync::Arc;

use crate::config::Config;
use crate::db::DbPool;

/// Application state passed to all handlers and middleware
#[derive(Clone)]
pub struct AppState {
    /// Shared database (users, sessions)
    pub db: DbPool,

    pub config: Arc<Config>,

    /// Signing key for the session cookie, derived from the session secret
    pub cookie_key: Key,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> Self {
        let cookie_key = derive_cookie_key(&config.session_secret);
        Self {
            db,
            config: Arc::new(config),
            cookie_key,
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Stretch an arbitrary-length secret to the 64 bytes a cookie `Key` needs.
fn derive_cookie_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}
