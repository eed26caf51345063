//! Router assembly: the request pipeline from access logging to the error page.

use axum::{
  extract::DefaultBodyLimit,
  middleware::{from_fn, from_fn_with_state},
  Router,
};
use tower_http::{
  services::ServeDir,
  trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::auth;
use crate::handlers::{self, error::render_errors};
use crate::session::middleware::load_session;
use crate::state::AppState;

/// Build the application.
///
/// Requests are logged and size-limited, then matched against the public
/// directory. Anything that is not a static file goes through the session,
/// identity and authorization stages to the routers. Faults from any of those
/// stages come back out through the error renderer.
pub fn router(state: AppState) -> Router {
  // Layers listed innermost first
  let pages = Router::new()
    .merge(handlers::index_router())
    .nest("/users", handlers::users_router())
    .method_not_allowed_fallback(handlers::not_found)
    .fallback(handlers::not_found)
    .layer(from_fn(auth::authorize))
    .layer(from_fn_with_state(state.clone(), auth::rehydrate_identity))
    .layer(from_fn_with_state(state.clone(), load_session))
    .layer(from_fn_with_state(state.clone(), render_errors))
    .with_state(state.clone());

  let static_files = ServeDir::new(&state.config.public_dir)
    .append_index_html_on_directories(false)
    .call_fallback_on_method_not_allowed(true)
    .fallback(pages);

  Router::new()
    .fallback_service(static_files)
    .layer(DefaultBodyLimit::max(state.config.body_limit_bytes))
    .layer(
      TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}
