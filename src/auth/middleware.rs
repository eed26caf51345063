//! Identity rehydration and the authorization gate.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, Uri},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::convert::Infallible;

use super::db as auth_db;
use crate::db;
use crate::domain::{CurrentUser, User};
use crate::error::AppResult;
use crate::session::{Session, FLASH_ERROR};
use crate::state::AppState;

/// Path prefixes that require an authenticated user
const PROTECTED_PREFIXES: &[&str] = &["/users"];

/// Exceptions under the protected prefixes
const PUBLIC_PATHS: &[&str] = &["/users/register"];

/// Pages that make no sense once logged in
const GUEST_ONLY_PATHS: &[&str] = &["/login", "/users/register"];

/// Who is making the current request.
///
/// Holds only the sanitized [`CurrentUser`]; a full [`User`] cannot be stored
/// here, so secret fields never reach handlers or templates.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    current_user: Option<CurrentUser>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Identity { current_user: None }
    }

    pub fn authenticated(user: User) -> Self {
        Identity {
            current_user: Some(user.into_current_user()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user.is_some()
    }

    pub fn current_user(&self) -> Option<&CurrentUser> {
        self.current_user.as_ref()
    }

    pub fn into_current_user(self) -> Option<CurrentUser> {
        self.current_user
    }
}

/// Anonymous unless [`rehydrate_identity`] ran for this request.
impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Identity>().cloned().unwrap_or_default())
    }
}

/// Resolve the session's user id into an [`Identity`].
///
/// A user id that no longer resolves (deleted account) is dropped from the
/// session and the request continues anonymously. The identity is also
/// attached to the response so the error page can use it.
pub async fn rehydrate_identity(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let identity = match session.user_id() {
        Some(user_id) => {
            let conn = db::try_lock(&state.db)?;
            match auth_db::get_user_by_id(&conn, user_id)? {
                Some(user) => Identity::authenticated(user),
                None => {
                    tracing::info!(user_id, "Session refers to a missing user, continuing anonymously");
                    session.clear_user();
                    Identity::anonymous()
                }
            }
        }
        None => Identity::anonymous(),
    };

    request.extensions_mut().insert(identity.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(identity);
    Ok(response)
}

/// Route-level access rules, applied once the identity is known.
pub async fn authorize(identity: Identity, session: Session, request: Request, next: Next) -> Response {
    let path = request.uri().path();

    if identity.is_authenticated() {
        if GUEST_ONLY_PATHS.contains(&path) {
            return Redirect::to("/").into_response();
        }
    } else if requires_login(path) {
        session.flash(FLASH_ERROR, "Please log in to continue.");
        return Redirect::to(&login_redirect(request.uri())).into_response();
    }

    next.run(request).await
}

fn requires_login(path: &str) -> bool {
    if PUBLIC_PATHS.contains(&path) {
        return false;
    }
    PROTECTED_PREFIXES.iter().any(|prefix| {
        path == *prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// `/login?next=<requested path and query>`
fn login_redirect(uri: &Uri) -> String {
    let target = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    format!("/login?next={}", urlencoding::encode(target))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_login() {
        assert!(requires_login("/users"));
        assert!(requires_login("/users/"));
        assert!(requires_login("/users/settings"));
        assert!(!requires_login("/users/register"));
        assert!(!requires_login("/usersettings"));
        assert!(!requires_login("/"));
        assert!(!requires_login("/login"));
    }

    #[test]
    fn test_login_redirect_encodes_target() {
        let uri: Uri = "/users?tab=trips".parse().unwrap();
        assert_eq!(login_redirect(&uri), "/login?next=%2Fusers%3Ftab%3Dtrips");
    }

    #[test]
    fn test_anonymous_identity() {
        let identity = Identity::default();
        assert!(!identity.is_authenticated());
        assert!(identity.current_user().is_none());
    }

    #[test]
    fn test_authenticated_identity_is_sanitized() {
        let user = User {
            id: 3,
            username: "amy".into(),
            salt: "c2FsdHNhbHQ".into(),
            password_hash: "aGFzaGhhc2g".into(),
            created_at: "2026-10-19T08:00:00+00:00".into(),
            last_login_at: None,
        };
        let identity = Identity::authenticated(user);

        assert!(identity.is_authenticated());
        let current = identity.into_current_user().unwrap();
        let debug = format!("{:?}", current);
        assert!(!debug.contains("c2FsdHNhbHQ"));
        assert!(!debug.contains("aGFzaGhhc2g"));
    }
}
