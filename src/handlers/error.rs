use askama::Template;
use axum::{
  body::Body,
  extract::{Request, State},
  http::{
    header::{CONTENT_LENGTH, CONTENT_TYPE},
    HeaderValue,
  },
  middleware::Next,
  response::Response,
};

use super::ViewContext;
use crate::auth::Identity;
use crate::error::Fault;
use crate::filters;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
  pub view: ViewContext,
  pub status: u16,
  pub message: String,
  /// Fault detail, only set in development
  pub error: Option<String>,
}

/// Largest fault-less error body read back as fault detail
const DETAIL_LIMIT_BYTES: usize = 64 * 1024;

/// Turn faulted responses into the error page.
///
/// Error responses built outside [`AppError`] (axum's own rejections) are
/// treated as faults too, with their body as the detail. Headers set further
/// in (the session cookie) are kept; only the body and content type are
/// replaced.
pub async fn render_errors(State(state): State<AppState>, request: Request, next: Next) -> Response {
  let response = next.run(request).await;
  let (mut parts, body) = response.into_parts();

  let (fault, body) = match parts.extensions.remove::<Fault>() {
    Some(fault) => (fault, body),
    None if parts.status.is_client_error() || parts.status.is_server_error() => {
      let detail = match axum::body::to_bytes(body, DETAIL_LIMIT_BYTES).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
          tracing::warn!("Failed to read error body: {}", e);
          String::new()
        }
      };
      let fault = Fault::from_status(parts.status, detail);
      let fallback = Body::from(fault.message.clone());
      parts.headers.remove(CONTENT_LENGTH);
      (fault, fallback)
    }
    None => return Response::from_parts(parts, body),
  };
  let identity = parts.extensions.remove::<Identity>().unwrap_or_default();

  let page = ErrorTemplate {
    view: ViewContext::from_identity(identity),
    status: fault.status.as_u16(),
    message: fault.message,
    error: state
      .config
      .environment
      .is_development()
      .then_some(fault.detail),
  };

  match page.render() {
    Ok(html) => {
      parts.status = fault.status;
      parts
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
      parts.headers.remove(CONTENT_LENGTH);
      Response::from_parts(parts, Body::from(html))
    }
    Err(e) => {
      tracing::error!("Failed to render error page: {}", e);
      Response::from_parts(parts, body)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::TestEnv;
  use axum::{http::StatusCode, middleware::from_fn_with_state, routing::get, Router};
  use axum_test::TestServer;

  fn server_over(env: &TestEnv, status: StatusCode, body: &'static str) -> TestServer {
    let state = env.state();
    let app = Router::new()
      .route("/", get(move || async move { (status, body) }))
      .layer(from_fn_with_state(state.clone(), render_errors))
      .with_state(state);
    TestServer::new(app).unwrap()
  }

  #[tokio::test]
  async fn test_bare_error_response_gets_error_page() {
    let env = TestEnv::new().unwrap();
    let server = server_over(&env, StatusCode::METHOD_NOT_ALLOWED, "raw rejection text");

    let response = server.get("/").await;

    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    let html = response.text();
    assert!(html.contains("<html"));
    assert!(html.contains("Method Not Allowed"));
    // Development shows the original body as detail
    assert!(html.contains("raw rejection text"));
  }

  #[tokio::test]
  async fn test_success_response_untouched() {
    let env = TestEnv::new().unwrap();
    let server = server_over(&env, StatusCode::OK, "plain");

    let response = server.get("/").await;

    response.assert_status_ok();
    assert_eq!(response.text(), "plain");
  }

  #[test]
  fn test_error_template_hides_missing_detail() {
    let page = ErrorTemplate {
      view: ViewContext::default(),
      status: 404,
      message: "Not Found".into(),
      error: None,
    };
    let html = page.render().unwrap();
    assert!(html.contains("404"));
    assert!(html.contains("Not Found"));
    assert!(!html.contains("<pre"));
  }

  #[test]
  fn test_error_template_shows_detail() {
    let page = ErrorTemplate {
      view: ViewContext::default(),
      status: 500,
      message: "Internal Server Error".into(),
      error: Some("Database error: boom".into()),
    };
    let html = page.render().unwrap();
    assert!(html.contains("Database error: boom"));
  }
}
