use askama::Template;
use axum::response::{IntoResponse, Redirect, Response};

use super::{render, ViewContext};
use crate::domain::CurrentUser;
use crate::error::AppResult;
use crate::filters;

#[derive(Template)]
#[template(path = "users/profile.html")]
pub struct ProfileTemplate {
  pub view: ViewContext,
  pub user: CurrentUser,
}

/// GET /users - Profile of the current user
pub async fn profile(view: ViewContext) -> AppResult<Response> {
  // The gate already redirects anonymous requests
  let Some(user) = view.current_user.clone() else {
    return Ok(Redirect::to("/login").into_response());
  };
  Ok(render(&ProfileTemplate { view, user })?.into_response())
}
