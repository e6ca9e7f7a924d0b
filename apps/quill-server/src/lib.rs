//! # Quill Server
//!
//! Actix-web front end of Quill: feeds, posts, comments and follows rendered
//! as JSON page contexts.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod page_cache;
pub mod state;
pub mod telemetry;

use actix_web::web;

pub use config::AppConfig;
pub use state::AppState;

use middleware::error::{self, AppError};

/// Register state, extractor error handlers, every route and the 404
/// fallback.
///
/// ```ignore
/// App::new()
///     .wrap(NormalizePath::trim())
///     .configure(quill_server::configure_app(state.clone()))
/// ```
pub fn configure_app(state: AppState) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(state.tokens.clone()))
            .app_data(web::Data::new(state))
            .app_data(
                web::PathConfig::default()
                    .error_handler(|err, _req| AppError::NotFound(err.to_string()).into()),
            )
            .app_data(
                web::QueryConfig::default()
                    .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
            )
            .app_data(
                web::FormConfig::default()
                    .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
            )
            .configure(handlers::configure_routes)
            .default_service(web::to(error::not_found));
    }
}
