//! Session loading and persistence around each request.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use chrono::Duration;
use rusqlite::Connection;

use super::{generate_session_id, store, Lifecycle, Session};
use crate::config::{self, Config};
use crate::db::{self, LogOnError};
use crate::error::AppResult;
use crate::state::AppState;

pub const SESSION_COOKIE_NAME: &str = "my_travel.sid";

/// What the response must do with the session cookie
#[derive(Debug, PartialEq, Eq)]
enum CookieUpdate {
    Issue(String),
    Clear,
}

/// Load the session named by the signed cookie (or start a new one), expose it
/// to the rest of the pipeline, then persist it and refresh the cookie.
///
/// A missing, tampered, expired or unknown cookie all yield a fresh session.
pub async fn load_session(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let cookie_id = jar.get(SESSION_COOKIE_NAME).map(|c| c.value().to_string());

    let session = {
        let conn = db::try_lock(&state.db)?;

        // Clean up expired sessions occasionally (~10% chance)
        if rand::random::<u8>() < config::SESSION_CLEANUP_THRESHOLD {
            store::cleanup_expired(&conn).log_warn("Failed to clean up expired sessions");
        }

        match cookie_id {
            Some(id) => match store::load(&conn, &id)? {
                Some(record) => Session::existing(record.id, record.state),
                None => {
                    tracing::debug!("Session cookie did not match a live session");
                    Session::fresh()
                }
            },
            None => Session::fresh(),
        }
    };

    request.extensions_mut().insert(session.clone());
    let response = next.run(request).await;

    let update = {
        let conn = db::try_lock(&state.db)?;
        commit(&conn, &session, state.config.session_ttl)?
    };

    let jar = match update {
        CookieUpdate::Issue(id) => jar.add(session_cookie(id, &state.config)),
        CookieUpdate::Clear => jar.remove(Cookie::build((SESSION_COOKIE_NAME, "")).path("/").build()),
    };
    Ok((jar, response).into_response())
}

/// Write the session's final state to the store.
fn commit(conn: &Connection, session: &Session, ttl: Duration) -> rusqlite::Result<CookieUpdate> {
    let snapshot = session.snapshot();
    match snapshot.lifecycle {
        Lifecycle::Destroyed => {
            if !snapshot.is_new {
                store::destroy(conn, &snapshot.id)?;
            }
            Ok(CookieUpdate::Clear)
        }
        Lifecycle::Regenerate => {
            if !snapshot.is_new {
                store::destroy(conn, &snapshot.id)?;
            }
            let id = generate_session_id();
            store::create(conn, &id, &snapshot.state, ttl)?;
            Ok(CookieUpdate::Issue(id))
        }
        Lifecycle::Active if snapshot.is_new => {
            store::create(conn, &snapshot.id, &snapshot.state, ttl)?;
            Ok(CookieUpdate::Issue(snapshot.id))
        }
        Lifecycle::Active => {
            store::save(conn, &snapshot.id, &snapshot.state, ttl)?;
            Ok(CookieUpdate::Issue(snapshot.id))
        }
    }
}

fn session_cookie(id: String, config: &Config) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .max_age(time::Duration::seconds(config.session_ttl.num_seconds()))
        .build()
}
