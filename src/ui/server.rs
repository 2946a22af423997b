//! Web server for the player control UI

use axum::{
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;

use super::{handlers, websocket};
use crate::config::UiConfig;
use crate::error::{Error, Result};
use crate::notify::BroadcastNotifier;
use crate::player::PlayerHandle;
use crate::source::StationCatalog;

/// Shared state for all routes
pub struct AppState {
    pub player: PlayerHandle,
    pub catalog: Arc<StationCatalog>,
    /// Source of notifications pushed to WebSocket clients
    pub notifications: BroadcastNotifier,
}

impl AppState {
    pub fn new(
        player: PlayerHandle,
        catalog: Arc<StationCatalog>,
        notifications: BroadcastNotifier,
    ) -> Self {
        Self {
            player,
            catalog,
            notifications,
        }
    }
}

/// HTTP + WebSocket server
pub struct WebServer {
    config: UiConfig,
    state: Arc<AppState>,
}

impl WebServer {
    pub fn new(config: UiConfig, state: AppState) -> Self {
        Self {
            config,
            state: Arc::new(state),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/status", get(handlers::get_status))
            .route("/api/stations", get(handlers::get_stations))
            .route("/api/play/:id", post(handlers::play_station))
            .route("/api/toggle", post(handlers::toggle_play_pause))
            .route("/api/stop", post(handlers::stop))
            .route("/api/volume", put(handlers::set_volume))
            .route("/api/mute", post(handlers::toggle_mute))
            .route("/ws", get(websocket::ws_handler))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Serve until the listener fails
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.http_port)
            .parse()
            .map_err(|e| Error::Config(format!("invalid UI bind address: {}", e)))?;

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Web UI listening on http://{}", addr);

        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    /// Run the server on its own task
    pub fn start_background(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.start().await {
                tracing::error!("Web server error: {}", e);
            }
        })
    }
}
