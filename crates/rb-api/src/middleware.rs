//! rusty-blog/crates/rb-api/src/middleware.rs Middleware
//!
//! Custom middleware for identity, authorization, logging and security headers.

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::error::ErrorInternalServerError;
use actix_web::middleware::{DefaultHeaders, Logger, Next};
use actix_web::{web, Error, HttpMessage};
use rb_core::error::AppError;
use rb_core::models::Viewer;

use crate::error::ApiError;
use crate::handlers::{redirect_with_flash, AppState};

// Returns a standard set of middleware for the Rusty-Blog API.
pub fn standard_middleware() -> Logger {
    // We use the 'default' logger which outputs:
    // remote-ip "request-line" status-code response-size "referrer" "user-agent"
    Logger::default()
}

// Security headers added to every response.
pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("Referrer-Policy", "strict-origin-when-cross-origin"))
        .add(("X-Frame-Options", "DENY"))
}

/// Resolves the session cookie into a [`Viewer`] and stores it in the
/// request extensions, where `CurrentViewer` picks it up.
///
/// Error pages produced further down are rendered for an anonymous
/// visitor; for a signed-in viewer they are rebuilt with their navigation.
pub async fn resolve_viewer<B: MessageBody>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .cloned()
        .ok_or_else(|| ErrorInternalServerError("application state is not registered"))?;

    let token = state.cookies.token(req.request());
    let viewer = state
        .blog
        .resolve_viewer(token.as_deref())
        .await
        .map_err(ApiError::from)?;

    req.extensions_mut().insert(viewer.clone());
    let res = next.call(req).await?;

    let page = match viewer {
        Viewer::Authenticated(_) => res
            .response()
            .error()
            .and_then(|err| err.as_error::<ApiError>())
            .map(|err| err.page(&viewer)),
        Viewer::Anonymous => None,
    };

    Ok(match page {
        Some(page) => res.into_response(page).map_into_right_body(),
        None => res.map_into_left_body(),
    })
}

/// Guards the post-management routes.
///
/// Anonymous visitors are sent to the login page; signed-in users without
/// the capability get a 401.
pub async fn require_admin<B: MessageBody>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    let viewer = req.extensions().get::<Viewer>().cloned().unwrap_or_default();

    match viewer.user() {
        None => {
            let res = redirect_with_flash("/login", "Please log in to access this page");
            Ok(req.into_response(res).map_into_right_body())
        }
        Some(user) if !user.role.can_manage_posts() => {
            log::warn!("user {} denied access to {}", user.id, req.path());
            let err = ApiError(AppError::Unauthorized("only the admin may manage posts".into()));
            Ok(req.error_response(err).map_into_right_body())
        }
        Some(_) => next.call(req).await.map(ServiceResponse::map_into_left_body),
    }
}
