//! HTTP API handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::Error;
use crate::player::PlayerSnapshot;
use crate::source::{Category, StationRecord};
use crate::ui::server::AppState;

/// API response wrapper
#[derive(serde::Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

type ApiResult<T> = (StatusCode, Json<ApiResponse<T>>);

/// Map the outcome of a player command onto a response
fn command_response(result: crate::Result<()>) -> ApiResult<()> {
    match result {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::ok(()))),
        Err(e @ Error::Source(_)) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(e.to_string())),
        ),
        Err(e) => {
            tracing::error!("Player command failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::error(e.to_string())),
            )
        }
    }
}

/// Current player state
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<ApiResponse<PlayerSnapshot>> {
    Json(ApiResponse::ok(state.player.snapshot()))
}

#[derive(Debug, Deserialize)]
pub struct StationQuery {
    /// Category name, or "all"
    pub category: Option<String>,
}

/// Active stations, optionally filtered by category
pub async fn get_stations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StationQuery>,
) -> ApiResult<Vec<StationRecord>> {
    let category = match query.category.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(name) => match name.parse::<Category>() {
            Ok(category) => Some(category),
            Err(e) => return (StatusCode::BAD_REQUEST, Json(ApiResponse::error(e))),
        },
    };

    let stations = state
        .catalog
        .by_category(category)
        .into_iter()
        .cloned()
        .collect();
    (StatusCode::OK, Json(ApiResponse::ok(stations)))
}

/// Start playing a catalog station
pub async fn play_station(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let Some(station) = state.catalog.find(&id).filter(|s| s.is_active) else {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Unknown station: {}", id))),
        );
    };

    command_response(state.player.select_and_play(station.to_source()).await)
}

pub async fn toggle_play_pause(State(state): State<Arc<AppState>>) -> ApiResult<()> {
    command_response(state.player.toggle_play_pause().await)
}

pub async fn stop(State(state): State<Arc<AppState>>) -> ApiResult<()> {
    command_response(state.player.stop().await)
}

#[derive(Debug, Deserialize)]
pub struct VolumeRequest {
    pub volume: u8,
}

pub async fn set_volume(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VolumeRequest>,
) -> ApiResult<()> {
    command_response(state.player.set_volume(req.volume).await)
}

pub async fn toggle_mute(State(state): State<Arc<AppState>>) -> ApiResult<()> {
    command_response(state.player.toggle_mute().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{media_event_channel, MockMediaElement};
    use crate::notify::BroadcastNotifier;
    use crate::player::{spawn_player, PlaybackState, PlayerSettings};
    use crate::probe::{HealthProbe, ProbeOutcome};
    use crate::source::StationCatalog;
    use async_trait::async_trait;

    struct NeverProbe;

    #[async_trait]
    impl HealthProbe for NeverProbe {
        async fn probe(&self, _url: &str) -> ProbeOutcome {
            ProbeOutcome::Unknown
        }
    }

    const STATIONS: &str = r#"
        [[stations]]
        id = "uno"
        name = "Radio Uno"
        stream_url = "https://a.example/uno"
        category = "news"
        region = "Norte"

        [[stations]]
        id = "dos"
        name = "Radio Dos"
        stream_url = "https://a.example/dos"
        category = "music"
        region = "Sur"

        [[stations]]
        id = "off"
        name = "Off Air"
        stream_url = "https://a.example/off"
        category = "music"
        region = "Sur"
        is_active = false
    "#;

    fn app_state() -> (Arc<AppState>, MockMediaElement) {
        let (tx, rx) = media_event_channel();
        let media = MockMediaElement::new(tx);
        let notifications = BroadcastNotifier::new(8);
        let (player, _task) = spawn_player(
            media.clone(),
            rx,
            Arc::new(NeverProbe),
            Arc::new(notifications.clone()),
            PlayerSettings::default(),
        );
        let catalog = Arc::new(StationCatalog::from_toml_str(STATIONS).unwrap());

        (Arc::new(AppState::new(player, catalog, notifications)), media)
    }

    #[tokio::test]
    async fn test_stations_filtered_by_category() {
        let (state, _media) = app_state();

        let all = StationQuery { category: Some("all".into()) };
        let (status, Json(body)) = get_stations(State(state.clone()), Query(all)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.data.unwrap().len(), 2);

        let music = StationQuery { category: Some("music".into()) };
        let (_, Json(body)) = get_stations(State(state.clone()), Query(music)).await;
        let ids: Vec<_> = body.data.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["dos".to_string()]);

        let bogus = StationQuery { category: Some("polka".into()) };
        let (status, Json(body)) = get_stations(State(state), Query(bogus)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
    }

    #[tokio::test]
    async fn test_play_station() {
        let (state, media) = app_state();

        let (status, _) = play_station(State(state.clone()), Path("uno".to_string())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(media.current_source().as_deref(), Some("https://a.example/uno"));
        assert_eq!(state.player.snapshot().playback_state, PlaybackState::Loading);
    }

    #[tokio::test]
    async fn test_play_unknown_or_inactive_station() {
        let (state, media) = app_state();

        let (status, Json(body)) =
            play_station(State(state.clone()), Path("nope".to_string())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error.as_deref(), Some("Unknown station: nope"));

        let (status, _) = play_station(State(state), Path("off".to_string())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(media.load_count(), 0);
    }

    #[tokio::test]
    async fn test_volume_request() {
        let (state, _media) = app_state();
        let mut rx = state.player.subscribe();

        let request = VolumeRequest { volume: 0 };
        let (status, _) = set_volume(State(state.clone()), Json(request)).await;
        assert_eq!(status, StatusCode::OK);

        rx.changed().await.unwrap();
        let snapshot = rx.borrow().clone();
        assert_eq!(snapshot.volume, 0);
        assert!(snapshot.muted);
    }

    #[test]
    fn test_api_response_serialization() {
        let json = serde_json::to_value(ApiResponse::<()>::error("boom")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "boom");
        assert!(json.get("data").is_none());
    }
}
