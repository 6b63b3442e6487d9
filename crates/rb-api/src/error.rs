//! # ApiError
//!
//! The HTTP face of `rb_core::AppError`.

use std::fmt;

use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use askama::Template;
use rb_core::error::AppError;
use rb_core::models::Viewer;
use rb_ui::ErrorTemplate;

#[derive(Debug)]
pub struct ApiError(pub AppError);

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl From<askama::Error> for ApiError {
    fn from(err: askama::Error) -> Self {
        ApiError(AppError::Internal(format!("template rendering failed: {err}")))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) | AppError::InvalidCredentials(_) => StatusCode::UNAUTHORIZED,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateEmail(_) | AppError::DuplicateTitle(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Internal(detail) = &self.0 {
            log::error!("internal error: {detail}");
        }
        self.page(&Viewer::Anonymous)
    }
}

impl ApiError {
    /// The error page as seen by `viewer`. `middleware::resolve_viewer`
    /// re-renders error responses with the signed-in user's navigation.
    pub fn page(&self, viewer: &Viewer) -> HttpResponse {
        let status = self.status_code();
        let message = match &self.0 {
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let page = ErrorTemplate {
            viewer,
            flash: None,
            status: status.as_u16(),
            message: &message,
        }
        .render()
        .unwrap_or(message);

        HttpResponse::build(status)
            .content_type(ContentType::html())
            .body(page)
    }
}
