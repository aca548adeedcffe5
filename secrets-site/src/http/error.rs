use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use thiserror::Error;
use tracing::error;

use crate::accounts::AccountError;
use crate::serve_files::FileServeError;
use crate::users::StoreError;

use super::views;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("login required to access {next}")]
    Unauthenticated { next: String },
    #[error("not found")]
    NotFound,
    #[error("bad request")]
    BadRequest,
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated { .. } => StatusCode::SEE_OTHER,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest => StatusCode::BAD_REQUEST,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AppError::Unauthenticated { next } => {
                Redirect::to(&views::login_url(Some(&next))).into_response()
            }
            other => (status, Html(views::render_error(status, &other.to_string()))).into_response(),
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        error!(error = %err, "account operation failed");
        AppError::Internal
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        error!(error = %err, "user store failed");
        AppError::Internal
    }
}

impl From<FileServeError> for AppError {
    fn from(err: FileServeError) -> Self {
        match err {
            FileServeError::NotFound => AppError::NotFound,
            FileServeError::InvalidPath => AppError::BadRequest,
            FileServeError::HeaderValue(_) => {
                error!(error = %err, "file serving failed");
                AppError::Internal
            }
        }
    }
}
