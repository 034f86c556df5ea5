use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;

mod api;
mod audit;
mod auth;
mod clock;
mod config;
mod db;
mod docs;
mod error;
mod ledger;
mod model;
mod policy;
mod report;
mod routes;
mod service;
mod state;
mod store;
#[cfg(test)]
mod testing;

use config::{Config, StorageBackend};
use db::init_db;

use crate::clock::SystemClock;
use crate::docs::ApiDoc;
use crate::model::{
    role::Role,
    user::{NewUser, Profile},
};
use crate::state::AppState;
use crate::store::{
    AttendanceStore, AuditSink, IdentityStore,
    memory::{MemoryAttendanceStore, MemoryAuditSink, MemoryIdentityStore},
    mysql::MySqlStore,
};
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

type Stores = (
    Arc<dyn IdentityStore>,
    Arc<dyn AttendanceStore>,
    Arc<dyn AuditSink>,
);

#[get("/")]
async fn index() -> impl Responder {
    "Attendance service"
}

async fn open_stores(config: &Config) -> anyhow::Result<Stores> {
    match config.storage_backend {
        StorageBackend::Mysql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            let store = Arc::new(MySqlStore::new(init_db(url, config.run_migrations).await?));
            Ok((store.clone(), store.clone(), store))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage, all data is lost on shutdown");
            let identities = Arc::new(MemoryIdentityStore::new());
            // Nobody could authenticate against an empty store.
            let admin = identities
                .insert_user(&NewUser {
                    role: Role::Administrator,
                    department_id: None,
                    profile: Profile {
                        full_name: "Administrator".into(),
                        email: "admin@example.com".into(),
                        position: None,
                    },
                })
                .await?;
            info!(user_id = admin.id, "Seeded administrator");
            Ok((
                identities,
                Arc::new(MemoryAttendanceStore::new()),
                Arc::new(MemoryAuditSink::new()),
            ))
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
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(backend = %config.storage_backend, "Server starting...");

    let (identities, records, audit_sink) = open_stores(&config).await?;
    let state = Data::new(AppState::new(
        identities,
        records,
        audit_sink,
        Arc::new(SystemClock),
        config.audit_queue_capacity,
    ));
    let audit = state.audit.clone();

    let protected = routes::configure(&config)?;
    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(state.clone())
            .app_data(config_data.clone())
            .service(index)
            .configure(protected.clone())
    })
    .bind(&server_addr)
    .with_context(|| format!("cannot bind {server_addr}"))?
    .run()
    .await?;

    audit.flush().await;
    info!("Server stopped");
    Ok(())
}
