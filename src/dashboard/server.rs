use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    body::Body,
    extract::Path,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use super::api::{self, AppState, SharedState};
use super::embedded::Assets;
use super::shell;
use super::ws;
use crate::plan::PlanLocation;
use crate::store::{MemoryStore, SqliteStore, StoreHandle};

/// Configuration for the dashboard server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Bind address outside dev mode.
    pub host: String,
    /// SQLite file; `None` keeps everything in memory for this process.
    pub db_path: Option<PathBuf>,
    pub plan: PlanLocation,
    pub dev_mode: bool,
    pub open_browser: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3141,
            host: "127.0.0.1".to_string(),
            db_path: Some(PathBuf::from(".handover/handover.db")),
            plan: PlanLocation::default(),
            dev_mode: false,
            open_browser: false,
        }
    }
}

/// Build the full application router: shell, fragments, API, WebSocket and
/// embedded assets.
pub fn build_router(state: SharedState) -> Router {
    api::api_router()
        .merge(shell::shell_router())
        .route("/ws", get(ws::ws_handler))
        .route("/assets/{*path}", get(static_asset))
        .with_state(state)
}

async fn static_asset(Path(path): Path<String>) -> Response {
    match Assets::get(&path) {
        Some(content) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, mime.as_ref().to_string())],
                Body::from(content.data.into_owned()),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "Asset not found").into_response(),
    }
}

/// Open the configured store. Creates the database directory if needed.
pub fn open_store(db_path: Option<&std::path::Path>) -> Result<StoreHandle> {
    match db_path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).context("Failed to create database directory")?;
            }
            let store = SqliteStore::open(path)
                .with_context(|| format!("Failed to open database {}", path.display()))?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(MemoryStore::new())),
    }
}

/// Start the dashboard server and run until Ctrl+C.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let store = open_store(config.db_path.as_deref())?;
    let state = Arc::new(AppState::new(store, config.plan.clone()));

    // Seed or repair the plan before the first page load.
    let loaded = state
        .plan
        .load()
        .await
        .context("Failed to load transition plan")?;
    if loaded.repaired {
        info!(version = loaded.version, "Transition plan seeded from template");
    }

    let mut app = build_router(state);
    if config.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let host = if config.dev_mode {
        "0.0.0.0"
    } else {
        config.host.as_str()
    };
    let addr = format!("{}:{}", host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    let url = format!("http://{}", local_addr);
    info!(%url, store = %describe_store(&config), "Dashboard listening");
    println!("Handover dashboard running at {}", url);

    if config.open_browser {
        if let Err(e) = open::that(&url) {
            warn!(error = %e, "Could not open browser");
        }
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    println!("Server shut down gracefully.");
    Ok(())
}

fn describe_store(config: &ServerConfig) -> String {
    match &config.db_path {
        Some(path) => path.display().to_string(),
        None => "in-memory".to_string(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C; shutting down");
    }
    println!("\nShutting down...");
}
