//! # rb-api
//!
//! The web routing and orchestration layer for Rusty-Blog.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod session;

use actix_web::middleware::from_fn;
use actix_web::web;

pub use error::ApiError;
pub use handlers::AppState;
pub use session::{CookieSettings, CurrentViewer, Flash};

/// Configures the routes for the blog.
///
/// # Developer Note
/// Everything sits in one scope so viewer resolution is part of the route
/// table itself; the binary only adds logging and headers on top. The
/// post-management resources are additionally wrapped in the admin guard.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("")
            .wrap(from_fn(middleware::resolve_viewer))
            // Public pages
            .route("/", web::get().to(handlers::index))
            .route("/about", web::get().to(handlers::about))
            .route("/contact", web::get().to(handlers::contact))
            // Authentication
            .service(
                web::resource("/register")
                    .route(web::get().to(handlers::register_form))
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/login")
                    .route(web::get().to(handlers::login_form))
                    .route(web::post().to(handlers::login)),
            )
            .route("/logout", web::get().to(handlers::logout))
            // Reading and commenting
            .service(
                web::resource("/post/{post_id}")
                    .route(web::get().to(handlers::show_post))
                    .route(web::post().to(handlers::add_comment)),
            )
            // Admin only
            .service(
                web::resource("/new-post")
                    .wrap(from_fn(middleware::require_admin))
                    .route(web::get().to(handlers::new_post_form))
                    .route(web::post().to(handlers::create_post)),
            )
            .service(
                web::resource("/edit-post/{post_id}")
                    .wrap(from_fn(middleware::require_admin))
                    .route(web::get().to(handlers::edit_post_form))
                    .route(web::post().to(handlers::update_post)),
            )
            .service(
                web::resource("/delete/{post_id}")
                    .wrap(from_fn(middleware::require_admin))
                    .route(web::get().to(handlers::delete_post)),
            ),
    );
}
