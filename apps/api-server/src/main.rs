//! # Quill API Server
//!
//! The Actix-web HTTP server for the Quill blogging platform.

use actix_files::Files;
use actix_web::{App, HttpServer, middleware::from_fn, web};
use tracing_actix_web::TracingLogger;

mod config;
mod handlers;
mod middleware;
mod observability;
mod state;
mod telemetry;

use config::AppConfig;
use observability::QuillRootSpan;
use state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env();
    telemetry::init_telemetry(config.json_logs);

    tracing::info!(
        "Starting Quill API Server on {}:{}",
        config.host,
        config.port
    );

    let state = AppState::new(&config)
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    // Uploaded files are served straight from the public disk.
    let storage_path = config.storage_path.clone();
    tokio::fs::create_dir_all(&storage_path).await?;

    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::<QuillRootSpan>::new())
            .wrap(from_fn(observability::request_id))
            .app_data(web::Data::new(state.clone()))
            .configure(handlers::configure_routes)
            .service(Files::new("/storage", &storage_path))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
