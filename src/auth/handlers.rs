//! Authentication handlers for login, registration, and logout.

use askama::Template;
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;

use super::db as auth_db;
use super::password;
use super::strategy::{self, AuthError};
use crate::db::{self, LogOnError};
use crate::error::{AppError, AppResult};
use crate::filters;
use crate::handlers::{extract::FormOrJson, render, ViewContext};
use crate::session::{Session, FLASH_ERROR, FLASH_INFO};
use crate::state::AppState;

/// Same text for unknown usernames and wrong passwords
const LOGIN_FAILED_MESSAGE: &str = "Incorrect username or password.";

const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub view: ViewContext,
    /// Where to go after a successful login
    pub next: String,
}

#[derive(Template)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub view: ViewContext,
}

#[derive(Deserialize)]
pub struct NextQuery {
    #[serde(default)]
    pub next: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub next: String,
}

#[derive(Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

/// GET /login - Show login page
pub async fn login_page(
    view: ViewContext,
    WithRejection(Query(query), _): WithRejection<Query<NextQuery>, AppError>,
) -> AppResult<Html<String>> {
    render(&LoginTemplate {
        view,
        next: query.next,
    })
}

/// POST /login - Verify credentials and bind the session to the user
pub async fn login_submit(
    State(state): State<AppState>,
    session: Session,
    FormOrJson(form): FormOrJson<LoginForm>,
) -> AppResult<Redirect> {
    // Only the lookup holds the lock; hashing happens after it is released
    let found = {
        let conn = db::try_lock(&state.db)?;
        strategy::find_user(&conn, &form.username)
    };
    let outcome = found.and_then(|user| strategy::check_password(user, &form.password));

    match outcome {
        Ok(user) => {
            {
                let conn = db::try_lock(&state.db)?;
                auth_db::update_last_login(&conn, user.id)
                    .log_warn(&format!("Failed to update last login for user {}", user.id));
            }
            session.log_in(user.id);
            tracing::info!(user_id = user.id, "User logged in");
            Ok(Redirect::to(safe_next(&form.next)))
        }
        Err(failure @ (AuthError::NotFound | AuthError::InvalidCredentials)) => {
            tracing::info!(username = %form.username, "Login rejected: {}", failure);
            session.flash(FLASH_ERROR, LOGIN_FAILED_MESSAGE);
            Ok(Redirect::to(&login_url(&form.next)))
        }
        Err(AuthError::Lookup(e)) => Err(AppError::Database(e)),
    }
}

/// GET|POST /logout - Destroy the session
pub async fn logout(session: Session) -> Redirect {
    if let Some(user_id) = session.user_id() {
        tracing::info!(user_id, "User logged out");
    }
    session.destroy();
    Redirect::to("/")
}

/// GET /users/register - Show registration page
pub async fn register_page(view: ViewContext) -> AppResult<Html<String>> {
    render(&RegisterTemplate { view })
}

/// POST /users/register - Create an account and log it in
pub async fn register_submit(
    State(state): State<AppState>,
    session: Session,
    FormOrJson(form): FormOrJson<RegisterForm>,
) -> AppResult<Response> {
    if let Err(problem) = validate_registration(&form) {
        session.flash(FLASH_ERROR, problem);
        return Ok(Redirect::to("/users/register").into_response());
    }

    let hashed = password::hash_password(&form.password)?;

    let user_id = {
        let conn = db::try_lock(&state.db)?;
        if auth_db::username_exists(&conn, &form.username)? {
            None
        } else {
            Some(auth_db::create_user(
                &conn,
                &form.username,
                &hashed.salt,
                &hashed.hash,
            )?)
        }
    };

    let Some(user_id) = user_id else {
        session.flash(FLASH_ERROR, "Username already exists.");
        return Ok(Redirect::to("/users/register").into_response());
    };

    tracing::info!(user_id, username = %form.username, "User registered");
    session.log_in(user_id);
    session.flash(FLASH_INFO, format!("Welcome, {}!", form.username));
    Ok(Redirect::to("/users").into_response())
}

fn validate_registration(form: &RegisterForm) -> Result<(), &'static str> {
    if !is_valid_username(&form.username) {
        return Err("Username must be 3-32 alphanumeric characters or underscores.");
    }
    if form.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err("Password must be at least 8 characters.");
    }
    if form.password != form.confirm_password {
        return Err("Passwords do not match.");
    }
    Ok(())
}

/// Validate username: 3-32 chars, alphanumeric or underscore
fn is_valid_username(username: &str) -> bool {
    username.len() >= 3
        && username.len() <= 32
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Only local absolute paths are accepted as post-login targets.
fn safe_next(next: &str) -> &str {
    let local = next.starts_with('/') && !next.starts_with("//") && !next.contains('\\');
    if local { next } else { "/" }
}

fn login_url(next: &str) -> String {
    if next.is_empty() {
        "/login".to_string()
    } else {
        format!("/login?next={}", urlencoding::encode(next))
    }
}
