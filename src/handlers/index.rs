use askama::Template;
use axum::response::Html;

use super::{render, ViewContext};
use crate::error::AppResult;
use crate::filters;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
  pub view: ViewContext,
}

/// GET / - Home page
pub async fn home(view: ViewContext) -> AppResult<Html<String>> {
  render(&IndexTemplate { view })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::CurrentUser;

  #[test]
  fn test_home_greets_user() {
    let page = IndexTemplate {
      view: ViewContext {
        is_authenticated: true,
        current_user: Some(CurrentUser {
          id: 1,
          username: "amy".into(),
          created_at: "2026-10-19T08:00:00+00:00".into(),
          last_login_at: None,
        }),
        messages: Vec::new(),
      },
    };
    let html = page.render().unwrap();
    assert!(html.contains("Welcome back, amy"));
  }

  #[test]
  fn test_home_anonymous() {
    let html = IndexTemplate { view: ViewContext::default() }.render().unwrap();
    assert!(html.contains("href=\"/login\""));
  }
}
