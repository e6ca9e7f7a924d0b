//! Quill server entry point.

use actix_web::middleware::NormalizePath;
use actix_web::{App, HttpServer};
use tracing_actix_web::TracingLogger;

use quill_server::telemetry::init_telemetry;
use quill_server::{AppConfig, AppState, configure_app};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env();
    init_telemetry(&config.telemetry);

    tracing::info!("Starting Quill server on {}:{}", config.host, config.port);

    let state = AppState::new(&config).await?;

    HttpServer::new(move || {
        App::new()
            .wrap(NormalizePath::trim())
            .wrap(TracingLogger::default())
            .configure(configure_app(state.clone()))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
