//! HTTP interface for fmea.
//!
//! Serves the entry form, the dashboard and the reports page as
//! server-rendered HTML.

pub mod form;
pub mod handlers;
pub mod render;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::storage::Database;

pub use form::FormState;
pub use render::Templates;

/// State shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Database handle; handlers connect per request.
    pub db: Database,
    /// Parsed page templates.
    pub templates: Arc<Templates>,
    /// Number of entries in the dashboard top list.
    pub top_n: usize,
}

impl AppState {
    /// Build the state for a database.
    ///
    /// # Errors
    ///
    /// Returns an error if the templates fail to parse.
    pub fn new(db: Database, top_n: usize) -> Result<Self> {
        Ok(Self {
            db,
            templates: Arc::new(Templates::new()?),
            top_n,
        })
    }

    /// Build the state from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the templates fail to parse.
    pub fn from_config(config: &Config) -> Result<Self> {
        let db = Database::new(config.database_path()).with_busy_timeout(config.busy_timeout());
        Self::new(db, config.dashboard.top_n)
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/home", get(handlers::home))
        .route(
            "/form",
            get(handlers::form_page).post(handlers::submit_form),
        )
        .route("/dashboard", get(handlers::dashboard))
        .route("/reports", get(handlers::reports))
        .route("/healthz", get(handlers::healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Initialize the database and serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the database can't be initialized or the address
/// can't be bound.
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let db = state.db.clone();
    tokio::task::spawn_blocking(move || db.initialize()).await??;

    let listener = TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until the process is killed
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
