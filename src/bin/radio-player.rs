//! Radio Player Application
//!
//! Plays a catalog station (or a bare stream URL) with automatic failover to
//! its backup stream, and optionally serves the control web UI.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use radio_failover::{
    config::AppConfig,
    constants::*,
    media::{media_event_channel, HttpMediaElement},
    notify::BroadcastNotifier,
    player::spawn_player,
    probe::HttpProbe,
    source::{Category, StationCatalog, StreamSource},
};
#[cfg(feature = "web-ui")]
use radio_failover::ui::{AppState, WebServer};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting radio player");

    let config_path = AppConfig::default_path().unwrap_or_else(|| PathBuf::from("config.toml"));
    let config = AppConfig::load_or_default(&config_path)?;

    let catalog_path = config.catalog_path(&config_path);
    let catalog = if catalog_path.exists() {
        StationCatalog::load(&catalog_path)?
    } else {
        tracing::warn!("No station catalog at {}", catalog_path.display());
        StationCatalog::default()
    };
    let catalog = Arc::new(catalog);

    // List available stations
    println!("\n=== Available Stations ===");
    for category in Category::ALL {
        let stations = catalog.by_category(Some(category));
        if stations.is_empty() {
            continue;
        }
        println!("  [{}]", category);
        for station in stations {
            let backup = if station.backup_stream_url.is_some() { " [BACKUP]" } else { "" };
            println!("    {} - {} ({}){}", station.id, station.name, station.region, backup);
        }
    }
    println!();

    let client = reqwest::Client::builder()
        .user_agent(config.probe.user_agent.clone())
        .connect_timeout(config.probe.timeout())
        .build()?;

    let (events_tx, events_rx) = media_event_channel();
    let media = HttpMediaElement::new(client.clone(), events_tx);
    let probe = Arc::new(HttpProbe::new(client, config.probe.timeout()));
    let notifications = BroadcastNotifier::new(NOTIFICATION_CAPACITY);

    let (player, player_task) = spawn_player(
        media,
        events_rx,
        probe,
        Arc::new(notifications.clone()),
        config.player_settings(),
    );

    // Start web UI
    #[cfg(feature = "web-ui")]
    if config.ui.enabled {
        let state = AppState::new(player.clone(), catalog.clone(), notifications.clone());
        let _web_handle = WebServer::new(config.ui.clone(), state).start_background();
        tracing::info!(
            "Web UI available at http://{}:{}",
            config.ui.bind_address,
            config.ui.http_port
        );
    }

    // Station id or stream URL from args
    if let Some(arg) = std::env::args().nth(1) {
        let source = match catalog.find(&arg) {
            Some(station) => Some(station.to_source()),
            None if arg.starts_with("http://") || arg.starts_with("https://") => {
                Some(StreamSource::new("cli", arg.clone(), arg.clone()))
            }
            None => {
                tracing::warn!("Unknown station: {}", arg);
                None
            }
        };
        if let Some(source) = source {
            player.select_and_play(source).await?;
        }
    }

    let mut snapshots = player.subscribe();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("Shutting down");
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                tracing::info!(
                    state = ?snapshot.playback_state,
                    url = ?snapshot.active_url_kind,
                    volume = snapshot.volume,
                    "{}",
                    snapshot.active_source_name.as_deref().unwrap_or("-")
                );
            }
        }
    }

    // Player may already be gone if its task ended
    let _ = player.shutdown().await;
    player_task.await?;

    Ok(())
}
