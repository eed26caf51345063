pub mod error;
pub mod extract;
pub mod index;
pub mod users;

use askama::Template;
use axum::{
  extract::FromRequestParts,
  http::request::Parts,
  response::Html,
  routing::get,
  Router,
};
use std::convert::Infallible;

use crate::auth::{self, Identity};
use crate::domain::CurrentUser;
use crate::error::{AppError, AppResult};
use crate::session::{FlashMessage, Session};
use crate::state::AppState;

/// Values every page template receives.
#[derive(Debug, Clone, Default)]
pub struct ViewContext {
  pub is_authenticated: bool,
  pub current_user: Option<CurrentUser>,
  /// Flash messages, drained from the session when the context is built
  pub messages: Vec<FlashMessage>,
}

impl ViewContext {
  pub fn new(identity: Identity, messages: Vec<FlashMessage>) -> Self {
    ViewContext {
      is_authenticated: identity.is_authenticated(),
      current_user: identity.into_current_user(),
      messages,
    }
  }

  /// Context without flash messages (error page)
  pub fn from_identity(identity: Identity) -> Self {
    Self::new(identity, Vec::new())
  }
}

impl<S: Send + Sync> FromRequestParts<S> for ViewContext {
  type Rejection = Infallible;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    let identity = parts.extensions.get::<Identity>().cloned().unwrap_or_default();
    let messages = parts
      .extensions
      .get::<Session>()
      .map(Session::take_flash)
      .unwrap_or_default();
    Ok(ViewContext::new(identity, messages))
  }
}

/// Render a template into an HTML response, faulting on template errors
pub fn render(template: &impl Template) -> AppResult<Html<String>> {
  Ok(Html(template.render()?))
}

/// Routes mounted at `/`
pub fn index_router() -> Router<AppState> {
  Router::new()
    .route("/", get(index::home))
    .route("/login", get(auth::login_page).post(auth::login_submit))
    .route("/logout", get(auth::logout).post(auth::logout))
}

/// Routes mounted at `/users`
pub fn users_router() -> Router<AppState> {
  Router::new()
    .route("/", get(users::profile))
    .route("/register", get(auth::register_page).post(auth::register_submit))
}

/// Fallback for unrouted requests
pub async fn not_found() -> AppError {
  AppError::NotFound
}
