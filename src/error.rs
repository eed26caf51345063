//! Request-level faults.
//!
//! Handlers and middleware return [`AppError`]. Its response carries a
//! [`Fault`] in the response extensions; the error-rendering stage picks that
//! up and produces the error page.

use axum::extract::rejection::{FormRejection, JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::auth::password::PasswordError;
use crate::db::DbLockError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Lock(#[from] DbLockError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("Template rendering failed: {0}")]
    Template(#[from] askama::Error),

    /// Body or query string that could not be parsed
    #[error("Malformed request: {0}")]
    BadRequest(String),

    #[error("Not Found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_)
            | AppError::Lock(_)
            | AppError::Password(_)
            | AppError::Template(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Hand-off from a failing stage to the error renderer.
#[derive(Debug, Clone)]
pub struct Fault {
    pub status: StatusCode,
    /// Safe to show in any environment
    pub message: String,
    /// Full fault description, shown only in development
    pub detail: String,
}

impl Fault {
    /// Fault for an error response produced outside [`AppError`], such as
    /// axum's own rejections. `detail` is whatever body it carried.
    pub fn from_status(status: StatusCode, detail: String) -> Self {
        Fault {
            status,
            message: public_message(status),
            detail,
        }
    }
}

fn public_message(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("Internal Server Error")
        .to_string()
}

impl From<&AppError> for Fault {
    fn from(err: &AppError) -> Self {
        let status = err.status_code();
        Fault {
            status,
            message: public_message(status),
            detail: format!("{}\n\n{:?}", err, err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let fault = Fault::from(&self);
        if fault.status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        // Plain fallback body for responses that bypass the error renderer
        let mut response = (fault.status, fault.message.clone()).into_response();
        response.extensions_mut().insert(fault);
        response
    }
}
