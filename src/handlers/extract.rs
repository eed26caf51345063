//! Body extraction for form posts that also accept JSON.

use axum::{
  extract::{FromRequest, Request},
  http::{header::CONTENT_TYPE, HeaderMap},
  Form, Json,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Deserializes a JSON body when the request says so, an urlencoded form
/// otherwise. Rejections of either become [`AppError::BadRequest`].
pub struct FormOrJson<T>(pub T);

impl<T, S> FromRequest<S> for FormOrJson<T>
where
  T: DeserializeOwned + Send,
  S: Send + Sync,
{
  type Rejection = AppError;

  async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
    if is_json(request.headers()) {
      let Json(value) = Json::<T>::from_request(request, state).await?;
      Ok(FormOrJson(value))
    } else {
      let Form(value) = Form::<T>::from_request(request, state).await?;
      Ok(FormOrJson(value))
    }
  }
}

/// `application/json` or any `+json` media type, parameters ignored
fn is_json(headers: &HeaderMap) -> bool {
  headers
    .get(CONTENT_TYPE)
    .and_then(|value| value.to_str().ok())
    .and_then(|value| value.split(';').next())
    .map(|essence| essence.trim().to_ascii_lowercase())
    .is_some_and(|essence| essence == "application/json" || essence.ends_with("+json"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::HeaderValue;

  fn with_content_type(value: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(value));
    headers
  }

  #[test]
  fn test_is_json() {
    assert!(is_json(&with_content_type("application/json")));
    assert!(is_json(&with_content_type("application/json; charset=utf-8")));
    assert!(is_json(&with_content_type("Application/JSON")));
    assert!(is_json(&with_content_type("application/vnd.api+json")));
  }

  #[test]
  fn test_form_and_missing_are_not_json() {
    assert!(!is_json(&with_content_type("application/x-www-form-urlencoded")));
    assert!(!is_json(&with_content_type("text/plain")));
    assert!(!is_json(&HeaderMap::new()));
  }
}
