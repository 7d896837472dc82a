mod auth;
mod config;
mod db;
mod errors;
mod models;
mod profile;
mod resume;
mod routes;
mod state;
mod store;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::{Argon2Hasher, JwtService};
use crate::config::Config;
use crate::db::{apply_schema, create_pool};
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{MemoryStore, PgStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume API v{}", env!("CARGO_PKG_VERSION"));

    // Pick the persistence backend
    let state = match &config.database_url {
        Some(database_url) => {
            let pool = create_pool(database_url, config.db_max_connections).await?;
            if config.db_apply_schema {
                apply_schema(&pool).await?;
            }
            let store = Arc::new(PgStore::new(pool));
            build_state(store.clone(), store, &config)
        }
        None => {
            warn!("DATABASE_URL not set; using the in-memory store, data is lost on exit");
            let store = Arc::new(MemoryStore::new());
            build_state(store.clone(), store, &config)
        }
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_state(
    resumes: Arc<dyn store::ResumeRepository>,
    users: Arc<dyn store::UserRepository>,
    config: &Config,
) -> AppState {
    AppState {
        resumes,
        users,
        hasher: Arc::new(Argon2Hasher::new()),
        jwt: Arc::new(JwtService::new(&config.jwt_secret, config.jwt_ttl_secs)),
        config: config.clone(),
    }
}
