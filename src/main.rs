use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod models;
mod routes;

use config::Config;
use db::{MySqlStore, hydrate, init_db};

use crate::docs::ApiDoc;
use hrm_workflow::Workflow;
use hrm_workflow::notify::TracingNotifier;
use hrm_workflow::persistence::{MemoryStore, Persistence};
use hrm_workflow::workflow::DisplayPolicy;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "HRM workflow service"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let display = DisplayPolicy::new(config.efficiency_ceiling)
        .context("EFFICIENCY_CEILING_PERCENT must be positive")?;
    let limiter = routes::build_limiter(config.rate_protected_per_min)?;

    let pool = match config.database_url.as_deref() {
        Some(url) => Some(init_db(url).await?),
        None => {
            warn!("DATABASE_URL not set; records are kept in memory only");
            None
        }
    };
    let persistence: Arc<dyn Persistence> = match &pool {
        Some(pool) => Arc::new(MySqlStore::new(pool.clone())),
        None => Arc::new(MemoryStore::new()),
    };

    let workflow = Data::new(
        Workflow::new(persistence, Arc::new(TracingNotifier)).with_display_policy(display),
    );

    if let Some(pool) = &pool {
        hydrate(pool, &workflow)
            .await
            .context("Failed to load workflow state from database")?;
    }

    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard matches JS/CSS assets
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(workflow.clone())
            .app_data(config_data.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, &config_data, limiter.clone()))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
