//! # Rusty-Blog Binary
//!
//! The entry point that assembles the application based on compile-time features.

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use rb_api::{configure_routes, middleware, AppState, CookieSettings};
use rb_core::BlogService;
use secrecy::ExposeSecret;

// Feature-gated imports: This is the "Compiled-to-Order" magic
#[cfg(feature = "db-sqlite")]
use rb_db_sqlite::SqliteStore;

#[cfg(feature = "auth-simple")]
use rb_auth_simple::SimpleAuthProvider;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let settings = rb_config::load().context("Failed to load configuration")?;
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(settings.log_level.as_str()));

    // 1. Initialize Database Implementation
    #[cfg(feature = "db-sqlite")]
    let store = Arc::new(
        SqliteStore::connect(
            settings.database.url.expose_secret(),
            settings.database.max_connections,
        )
        .await
        .context("Failed to init SQLite")?,
    );

    // 2. Initialize Auth Implementation
    #[cfg(feature = "auth-simple")]
    let auth = Arc::new(
        SimpleAuthProvider::with_cost(
            settings.auth.argon2_memory_kib,
            settings.auth.argon2_iterations,
            settings.auth.argon2_parallelism,
        )
        .context("Failed to init password hashing")?,
    );

    // 3. Wrap in AppState (Using dynamic dispatch for maximum flexibility)
    let blog = BlogService::new(
        store.clone(),
        store.clone(),
        store,
        auth,
        chrono::Duration::hours(settings.session.ttl_hours),
    );
    let state = web::Data::new(AppState {
        blog,
        cookies: CookieSettings::new(
            settings.session.cookie_name.clone(),
            settings.session.secure_cookie,
            settings.session.ttl_hours,
        ),
    });

    let (host, port) = settings.server_address();
    log::info!("🚀 Rusty-Blog starting on http://{host}:{port}");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::security_headers())
            .wrap(middleware::standard_middleware())
            .configure(configure_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    Ok(())
}
