use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod services;
mod store;
mod utils;

use config::{Config, StoreBackend};
use db::init_db;
use model::employee::Employee;
use routes::AppState;
use store::{MemoryStore, MySqlStore, PayrollStore};

use crate::docs::ApiDoc;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Payroll analytics service"
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn PayrollStore>> {
    match config.store_backend {
        StoreBackend::MySql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set for the mysql store")?;
            let pool = init_db(url).await?;
            Ok(Arc::new(MySqlStore::new(pool)))
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store, data is lost on restart");
            let store = MemoryStore::new();
            if let Some(path) = config.memory_seed_file.as_deref() {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("cannot read {path}"))?;
                let employees: Vec<Employee> = serde_json::from_str(&raw)
                    .with_context(|| format!("{path} is not a JSON array of employees"))?;
                let count = employees.len();
                for employee in employees {
                    store.upsert_employee(employee)?;
                }
                info!(path, count, "Seeded in-memory employees");
            }
            Ok(Arc::new(store))
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(
        addr = %config.server_addr,
        backend = ?config.store_backend,
        "Server starting..."
    );

    let store = build_store(&config).await?;
    let server_addr = config.server_addr.clone();
    let state = AppState::new(config, store)?;

    HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .service(index)
            // protected routes with rate limiting
            .configure(move |cfg| routes::configure(cfg, state))
    })
    .bind(&server_addr)
    .with_context(|| format!("cannot bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
