//! Playback state, session and snapshot types

use serde::Serialize;
use std::time::Duration;

use crate::constants;
use crate::probe::ProbeOutcome;
use crate::source::{StreamSource, UrlKind};

/// Externally visible playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    Buffering,
    Error,
}

impl PlaybackState {
    /// Audio is (or should be) coming out
    pub fn is_active(self) -> bool {
        matches!(self, PlaybackState::Playing | PlaybackState::Buffering)
    }
}

/// Tunables of the retry and monitoring logic
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSettings {
    /// Total attempts per play request, across both URL kinds
    pub max_retries: u32,
    pub load_timeout: Duration,
    /// Delay before switching to the backup URL
    pub backup_retry_delay: Duration,
    /// Delay before retrying the same URL
    pub retry_delay: Duration,
    pub health_check_interval: Duration,
    pub initial_volume: u8,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            max_retries: constants::MAX_RETRIES,
            load_timeout: constants::LOAD_TIMEOUT,
            backup_retry_delay: constants::BACKUP_RETRY_DELAY,
            retry_delay: constants::RETRY_DELAY,
            health_check_interval: constants::HEALTH_CHECK_INTERVAL,
            initial_volume: constants::DEFAULT_VOLUME,
        }
    }
}

/// Working state for the currently selected source
#[derive(Debug, Clone)]
pub(crate) struct PlaybackSession {
    pub source: StreamSource,
    pub url_kind: UrlKind,
    pub attempt_count: u32,
    pub state: PlaybackState,
    /// An attempt is waiting for readiness or failure
    pub awaiting_ready: bool,
    /// Last probe result for the URL that is not bound
    pub alternate_health: Option<(UrlKind, ProbeOutcome)>,
}

impl PlaybackSession {
    pub fn new(source: StreamSource, url_kind: UrlKind) -> Self {
        Self {
            source,
            url_kind,
            attempt_count: 0,
            state: PlaybackState::Loading,
            awaiting_ready: false,
            alternate_health: None,
        }
    }

    pub fn active_url(&self) -> &str {
        self.source.url_for(self.url_kind)
    }

    /// The URL health checks should look at, if the source has two
    pub fn alternate(&self) -> Option<(UrlKind, &str)> {
        if !self.source.has_backup() {
            return None;
        }
        let kind = self.url_kind.alternate();
        Some((kind, self.source.url_for(kind)))
    }

    /// Whether the last probe found the given kind reachable
    pub fn alternate_reachable(&self, kind: UrlKind) -> bool {
        matches!(self.alternate_health, Some((k, outcome)) if k == kind && outcome.is_reachable())
    }
}

/// What a view needs to render the player
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PlayerSnapshot {
    pub active_source_id: Option<String>,
    pub active_source_name: Option<String>,
    pub active_url_kind: Option<UrlKind>,
    pub playback_state: PlaybackState,
    pub volume: u8,
    pub muted: bool,
    pub attempt_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = PlayerSettings::default();
        assert_eq!(settings.max_retries, 3);
        assert_eq!(settings.load_timeout, Duration::from_secs(15));
        assert_eq!(settings.health_check_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_session_alternate() {
        let plain = StreamSource::new("a", "A", "https://a.example/stream");
        assert!(PlaybackSession::new(plain, UrlKind::Primary).alternate().is_none());

        let dual = StreamSource::new("a", "A", "https://a.example/stream")
            .with_backup("https://b.example/stream");
        let mut session = PlaybackSession::new(dual, UrlKind::Primary);
        assert_eq!(
            session.alternate(),
            Some((UrlKind::Backup, "https://b.example/stream"))
        );

        session.alternate_health = Some((UrlKind::Backup, ProbeOutcome::Unknown));
        assert!(!session.alternate_reachable(UrlKind::Backup));
        session.alternate_health = Some((UrlKind::Backup, ProbeOutcome::Reachable));
        assert!(session.alternate_reachable(UrlKind::Backup));
    }

    #[test]
    fn test_snapshot_serialization() {
        let snapshot = PlayerSnapshot {
            playback_state: PlaybackState::Buffering,
            active_url_kind: Some(UrlKind::Backup),
            volume: 80,
            ..PlayerSnapshot::default()
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["playback_state"], "buffering");
        assert_eq!(json["active_url_kind"], "backup");
    }
}
