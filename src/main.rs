//! Clan Registry Service
//!
//! Clans, ranked membership and the points economy for the chat server, backed
//! by SQLite and driven through text admin commands.

mod api;
mod audit;
mod auth;
mod channels;
mod commands;
mod config;
mod db;
mod errors;
mod models;
mod registry;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use audit::Modlog;
use auth::Privileges;
use channels::RoomDirectory;
use config::Config;
use db::Repository;
use registry::ClanRegistry;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ClanRegistry>,
    pub repo: Arc<Repository>,
    pub privileges: Arc<Privileges>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Clan Registry Service");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (CLANS_API_PSK). Authentication is disabled!");
    }
    if config.admins.is_empty() {
        tracing::warn!("No elevated users configured (CLANS_ADMINS). Clans cannot be created.");
    }

    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    let rooms = Arc::new(RoomDirectory::with_reserved(config.reserved_rooms.clone()));
    let registry = Arc::new(ClanRegistry::new(
        repo.clone(),
        rooms,
        Arc::new(Modlog::new(repo.clone())),
    ));

    let restored = registry.restore_channels().await?;
    tracing::info!("Restored {} clan rooms", restored);

    let state = AppState {
        registry,
        repo,
        privileges: Arc::new(Privileges::new(&config.admins)),
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let psk = state.config.api_psk.clone();

    let api_routes = Router::new()
        .route("/commands", post(api::run_command))
        .route("/clans", get(api::list_clans))
        .route("/clans/{id}", get(api::get_clan))
        .route("/modlog", get(api::list_modlog))
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
