use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::error::AppError;

/// Transport-level wrapper around [`AppError`].
///
/// `Form` failures re-render the named form: the body carries the form name and
/// the message, never the submitted values.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    App(#[from] AppError),
    #[error("{source}")]
    Form {
        form: &'static str,
        source: AppError,
    },
}

impl ApiError {
    pub fn form(form: &'static str) -> impl FnOnce(AppError) -> ApiError {
        move |source| ApiError::Form { form, source }
    }

    fn app_error(&self) -> &AppError {
        match self {
            ApiError::App(source) | ApiError::Form { source, .. } => source,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.app_error() {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Store(_) | AppError::Hash(_) | AppError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let source = self.app_error();
        let message = if source.is_internal() {
            error!(error = %source, "request failed");
            String::from("internal server error")
        } else {
            source.to_string()
        };

        let body = match &self {
            ApiError::App(_) => serde_json::json!({ "error": message }),
            ApiError::Form { form, .. } => serde_json::json!({ "error": message, "form": form }),
        };
        (status, Json(body)).into_response()
    }
}
