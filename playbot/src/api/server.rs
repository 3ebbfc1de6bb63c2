//! HTTP server setup and routing

use crate::commands::CommandService;
use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::state::SharedState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub commands: Arc<CommandService>,
    pub state: Arc<SharedState>,
}

/// Build the router with every endpoint attached
pub fn create_router(ctx: AppContext) -> Router {
    use super::handlers;

    let api = Router::new()
        // Sessions
        .route("/sessions/:id", get(handlers::session_status))
        .route("/sessions/:id/join", post(handlers::join))
        .route("/sessions/:id/leave", post(handlers::leave))
        .route("/sessions/:id/queue", get(handlers::list_queue).post(handlers::enqueue))
        .route("/sessions/:id/queue/:index", delete(handlers::remove_from_queue))
        .route("/sessions/:id/skip", post(handlers::skip))
        .route("/sessions/:id/clear", post(handlers::clear))
        .route("/sessions/:id/shuffle", post(handlers::shuffle))
        .route("/sessions/:id/playlist/:name", post(handlers::enqueue_playlist))
        // Playlists
        .route("/playlists", get(handlers::list_playlists).post(handlers::create_playlist))
        .route(
            "/playlists/:name",
            get(handlers::show_playlist).delete(handlers::delete_playlist),
        )
        .route("/playlists/:name/tracks/:index", delete(handlers::remove_from_playlist))
        .route("/playlists/:name/from-session/:id", post(handlers::add_queue_to_playlist));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/events", get(super::sse::event_stream))
        .nest("/api/v1", api)
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve the API until `shutdown` resolves
pub async fn run(
    config: &ServerConfig,
    ctx: AppContext,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.bind, config.port)
        .parse()
        .map_err(|e| Error::Config(format!("Invalid bind address {}: {}", config.bind, e)))?;

    let app = create_router(ctx);

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
