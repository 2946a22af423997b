//! Stream playback controller
//!
//! A synchronous state machine that owns one media element. Inputs arrive
//! through four entry points (caller commands, [`handle_media_event`],
//! [`handle_timer`] and [`handle_probe_result`]); the controller never
//! blocks, never sleeps and never returns runtime failures to its caller.
//!
//! ```text
//!                select_and_play / resume
//!                          │
//!                          ▼
//!   ┌──────┐  stop   ┌──────────┐  can-play   ┌─────────┐  waiting  ┌───────────┐
//!   │ Idle │◄────────│ Loading  │────────────►│ Playing │──────────►│ Buffering │
//!   └──────┘         └──────────┘             └─────────┘◄──────────└───────────┘
//!                     ▲   │ error/timeout          │ error              playing
//!        retry timer  │   ▼                        ▼
//!                  ┌─────────────┐  attempts left  ┌───────┐
//!                  │  failover   │◄────────────────│ Error │
//!                  └─────────────┘                 └───────┘
//! ```
//!
//! [`handle_media_event`]: StreamPlaybackController::handle_media_event
//! [`handle_timer`]: StreamPlaybackController::handle_timer
//! [`handle_probe_result`]: StreamPlaybackController::handle_probe_result

use std::sync::Arc;
use tokio::sync::watch;

use super::state::{PlaybackSession, PlaybackState, PlayerSettings, PlayerSnapshot};
use super::timer::{Scheduler, TimerEvent, TimerHandle, TimerKind};
use crate::error::SourceError;
use crate::media::{MediaElement, MediaErrorCode, MediaEvent};
use crate::notify::{Notification, Notifier};
use crate::probe::ProbeOutcome;
use crate::source::{StreamFormat, StreamSource, UrlKind};

/// Why a connection attempt failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Media(MediaErrorCode),
    LoadTimeout,
    PlayRejected(String),
}

impl FailureReason {
    pub fn user_message(&self) -> &str {
        match self {
            FailureReason::Media(code) => code.user_message(),
            FailureReason::LoadTimeout => "The station did not respond in time.",
            FailureReason::PlayRejected(_) => "Playback could not be started.",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Media(code) => write!(f, "media error {:?}", code),
            FailureReason::LoadTimeout => f.write_str("load timeout"),
            FailureReason::PlayRejected(reason) => write!(f, "play rejected: {}", reason),
        }
    }
}

/// Probe the runtime should run on the controller's behalf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub url: String,
    pub kind: UrlKind,
    pub epoch: u64,
}

impl ProbeRequest {
    pub fn complete(&self, outcome: ProbeOutcome) -> ProbeReport {
        ProbeReport {
            kind: self.kind,
            outcome,
            epoch: self.epoch,
        }
    }
}

/// Finished probe, fed back through [`StreamPlaybackController::handle_probe_result`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReport {
    pub kind: UrlKind,
    pub outcome: ProbeOutcome,
    pub epoch: u64,
}

enum NextStep {
    Failover { immediate: bool },
    Retry { attempt: u32 },
    GiveUp { name: String },
}

/// Primary/backup failover player for a single stream at a time
pub struct StreamPlaybackController<M: MediaElement, S: Scheduler> {
    media: M,
    scheduler: S,
    notifier: Arc<dyn Notifier>,
    settings: PlayerSettings,
    session: Option<PlaybackSession>,
    volume: u8,
    muted: bool,
    /// Bumped whenever outstanding timers and probes become meaningless
    epoch: u64,
    load_timer: Option<TimerHandle>,
    retry_timer: Option<TimerHandle>,
    health_timer: Option<TimerHandle>,
    snapshot_tx: watch::Sender<PlayerSnapshot>,
}

impl<M: MediaElement, S: Scheduler> StreamPlaybackController<M, S> {
    pub fn new(
        mut media: M,
        scheduler: S,
        notifier: Arc<dyn Notifier>,
        settings: PlayerSettings,
    ) -> Self {
        let volume = settings.initial_volume.min(100);
        media.set_volume(f32::from(volume) / 100.0);
        media.set_muted(false);

        let (snapshot_tx, _) = watch::channel(PlayerSnapshot {
            volume,
            ..PlayerSnapshot::default()
        });

        Self {
            media,
            scheduler,
            notifier,
            settings,
            session: None,
            volume,
            muted: false,
            epoch: 0,
            load_timer: None,
            retry_timer: None,
            health_timer: None,
            snapshot_tx,
        }
    }

    /// Receive a fresh snapshot after every visible state change
    pub fn subscribe(&self) -> watch::Receiver<PlayerSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        let session = self.session.as_ref();
        PlayerSnapshot {
            active_source_id: session.map(|s| s.source.id.clone()),
            active_source_name: session.map(|s| s.source.display_name.clone()),
            active_url_kind: session.map(|s| s.url_kind),
            playback_state: self.playback_state(),
            volume: self.volume,
            muted: self.muted,
            attempt_count: session.map_or(0, |s| s.attempt_count),
        }
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.session.as_ref().map_or(PlaybackState::Idle, |s| s.state)
    }

    pub fn active_source(&self) -> Option<&StreamSource> {
        self.session.as_ref().map(|s| &s.source)
    }

    pub fn active_url_kind(&self) -> Option<UrlKind> {
        self.session.as_ref().map(|s| s.url_kind)
    }

    // ----- caller commands -----

    /// Stop whatever is playing and start `source` from its primary URL
    ///
    /// Only validation failures are returned; everything after that is
    /// reported through the snapshot and notifications.
    pub fn select_and_play(&mut self, source: StreamSource) -> Result<(), SourceError> {
        source.validate()?;

        tracing::info!(station = %source.id, "Selecting {}", source.display_name);
        self.teardown();
        self.session = Some(PlaybackSession::new(source, UrlKind::Primary));
        self.begin_attempt();
        Ok(())
    }

    /// Pause while playing, otherwise resume the selected source
    ///
    /// Resuming keeps the URL kind that was last in use.
    pub fn toggle_play_pause(&mut self) {
        let Some(state) = self.session.as_ref().map(|s| s.state) else {
            tracing::debug!("Play/pause ignored, nothing selected");
            return;
        };

        if state.is_active() {
            self.pause();
        } else {
            self.resume();
        }
    }

    /// Set the volume (clamped to 0..=100); zero mutes, anything else unmutes
    pub fn set_volume(&mut self, level: u8) {
        let level = level.min(100);
        self.volume = level;
        self.muted = level == 0;
        self.media.set_volume(f32::from(level) / 100.0);
        self.media.set_muted(self.muted);
        self.publish();
    }

    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
        self.media.set_muted(self.muted);
        self.publish();
    }

    /// Halt playback and rewind; the last source stays selected
    pub fn stop(&mut self) {
        self.teardown();
        if let Some(session) = self.session.as_mut() {
            session.state = PlaybackState::Idle;
            session.awaiting_ready = false;
            tracing::info!(station = %session.source.id, "Playback stopped");
        }
        self.publish();
    }

    // ----- asynchronous inputs -----

    /// Apply one event reported by the media element
    pub fn handle_media_event(&mut self, event: MediaEvent) {
        let Some(session) = self.session.as_mut() else {
            tracing::trace!("Media event {:?} without a session", event);
            return;
        };
        let state = session.state;
        let awaiting = session.awaiting_ready;

        match event {
            MediaEvent::LoadStart => {
                if awaiting {
                    session.state = PlaybackState::Loading;
                    self.publish();
                }
            }
            MediaEvent::CanPlay | MediaEvent::CanPlayThrough => {
                if awaiting {
                    self.on_ready(true);
                }
            }
            MediaEvent::Playing => {
                if awaiting {
                    self.on_ready(false);
                } else if state == PlaybackState::Buffering {
                    session.state = PlaybackState::Playing;
                    self.publish();
                }
            }
            MediaEvent::Waiting | MediaEvent::Stalled => {
                if state == PlaybackState::Playing {
                    tracing::debug!("Stream buffering ({:?})", event);
                    session.state = PlaybackState::Buffering;
                    self.publish();
                } else if awaiting {
                    tracing::debug!("Stream stalled while loading");
                }
            }
            MediaEvent::Pause => {
                if state.is_active() {
                    session.state = PlaybackState::Paused;
                    self.health_timer = None;
                    self.publish();
                }
            }
            MediaEvent::Ended => {
                if state.is_active() || awaiting {
                    tracing::info!(station = %session.source.id, "Stream ended");
                    session.state = PlaybackState::Idle;
                    session.awaiting_ready = false;
                    self.cancel_timers();
                    self.epoch += 1;
                    self.publish();
                }
            }
            MediaEvent::Error(code) => {
                if awaiting || state.is_active() {
                    session.state = PlaybackState::Error;
                    self.fail_attempt(FailureReason::Media(code), !awaiting);
                } else {
                    tracing::debug!("Ignoring media error {:?} in state {:?}", code, state);
                }
            }
        }
    }

    /// Apply a timer that has elapsed
    ///
    /// Returns a probe to run when the timer was a health check.
    pub fn handle_timer(&mut self, event: TimerEvent) -> Option<ProbeRequest> {
        if event.epoch != self.epoch {
            tracing::debug!("Ignoring stale {:?} timer", event.kind);
            return None;
        }

        match event.kind {
            TimerKind::LoadTimeout => {
                self.load_timer = None;
                let session = self.session.as_mut()?;
                if session.awaiting_ready {
                    session.state = PlaybackState::Error;
                    self.fail_attempt(FailureReason::LoadTimeout, false);
                }
                None
            }
            TimerKind::Retry => {
                self.retry_timer = None;
                let session = self.session.as_ref()?;
                if session.state == PlaybackState::Loading && !session.awaiting_ready {
                    self.begin_attempt();
                }
                None
            }
            TimerKind::HealthCheck => {
                self.health_timer = None;
                let session = self.session.as_ref()?;
                if !session.state.is_active() {
                    return None;
                }
                let (kind, url) = session.alternate()?;
                let request = ProbeRequest {
                    url: url.to_string(),
                    kind,
                    epoch: self.epoch,
                };

                self.arm_health_check();
                Some(request)
            }
        }
    }

    /// Cache the outcome of a health probe for the next failover decision
    pub fn handle_probe_result(&mut self, report: ProbeReport) {
        if report.epoch != self.epoch {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            tracing::debug!("{} stream probe: {:?}", report.kind, report.outcome);
            session.alternate_health = Some((report.kind, report.outcome));
        }
    }

    // ----- internals -----

    fn pause(&mut self) {
        self.cancel_timers();
        self.epoch += 1;
        self.media.pause();
        if let Some(session) = self.session.as_mut() {
            session.state = PlaybackState::Paused;
            session.awaiting_ready = false;
        }
        self.publish();
    }

    fn resume(&mut self) {
        let Some((source, kind)) = self
            .session
            .as_ref()
            .map(|s| (s.source.clone(), s.url_kind))
        else {
            return;
        };

        tracing::info!(station = %source.id, "Resuming on {} stream", kind);
        self.teardown();
        self.session = Some(PlaybackSession::new(source, kind));
        self.begin_attempt();
    }

    /// Release the media element and invalidate everything in flight
    fn teardown(&mut self) {
        self.cancel_timers();
        self.epoch += 1;
        self.media.pause();
        self.media.reset_position();
    }

    fn cancel_timers(&mut self) {
        let timers = [
            self.load_timer.take(),
            self.retry_timer.take(),
            self.health_timer.take(),
        ];
        for timer in timers.into_iter().flatten() {
            timer.cancel();
        }
    }

    fn begin_attempt(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.state = PlaybackState::Loading;
        session.awaiting_ready = true;

        let url = session.active_url().to_string();
        tracing::info!(
            station = %session.source.id,
            url = %url,
            attempt = session.attempt_count + 1,
            "Loading {} stream",
            session.url_kind
        );
        if StreamFormat::detect(&url) == StreamFormat::Hls {
            tracing::debug!("Detected HLS stream format");
        }

        self.epoch += 1;
        self.media.set_source(&url);
        self.media.load();
        self.load_timer = Some(self.scheduler.schedule(
            self.settings.load_timeout,
            TimerEvent {
                kind: TimerKind::LoadTimeout,
                epoch: self.epoch,
            },
        ));
        self.publish();
    }

    fn on_ready(&mut self, start_playback: bool) {
        self.load_timer = None;
        self.media.set_volume(f32::from(self.volume) / 100.0);
        self.media.set_muted(self.muted);

        if start_playback {
            if let Err(e) = self.media.play() {
                if let Some(session) = self.session.as_mut() {
                    session.state = PlaybackState::Error;
                }
                self.fail_attempt(FailureReason::PlayRejected(e.to_string()), false);
                return;
            }
        }

        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.awaiting_ready = false;
        session.state = PlaybackState::Playing;
        // A connection that came up earns a fresh set of attempts
        session.attempt_count = 0;

        let message = match session.url_kind {
            UrlKind::Primary => format!("Now playing: {}", session.source.display_name),
            UrlKind::Backup => format!(
                "Now playing: {} (alternate stream)",
                session.source.display_name
            ),
        };
        let has_backup = session.source.has_backup();

        self.notifier.notify(Notification::success(message));
        if has_backup {
            self.arm_health_check();
        }
        self.publish();
    }

    fn arm_health_check(&mut self) {
        self.health_timer = Some(self.scheduler.schedule(
            self.settings.health_check_interval,
            TimerEvent {
                kind: TimerKind::HealthCheck,
                epoch: self.epoch,
            },
        ));
    }

    /// Decide between failover, retry and giving up
    fn fail_attempt(&mut self, reason: FailureReason, while_playing: bool) {
        self.cancel_timers();
        self.epoch += 1;
        let max_retries = self.settings.max_retries.max(1);

        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.awaiting_ready = false;

        tracing::warn!(
            station = %session.source.id,
            attempt = session.attempt_count + 1,
            "{} stream failed: {}",
            session.url_kind,
            reason
        );

        let step = if session.url_kind == UrlKind::Primary
            && session.source.has_backup()
            && session.attempt_count + 1 < max_retries
        {
            let immediate = while_playing && session.alternate_reachable(UrlKind::Backup);
            session.url_kind = UrlKind::Backup;
            session.attempt_count += 1;
            session.state = PlaybackState::Loading;
            NextStep::Failover { immediate }
        } else if session.attempt_count + 1 < max_retries {
            session.attempt_count += 1;
            session.state = PlaybackState::Loading;
            NextStep::Retry {
                attempt: session.attempt_count + 1,
            }
        } else {
            session.state = PlaybackState::Error;
            NextStep::GiveUp {
                name: session.source.display_name.clone(),
            }
        };
        let backup_url = session.source.url_for(UrlKind::Backup).to_string();

        match step {
            NextStep::Failover { immediate } => {
                self.notifier
                    .notify(Notification::info("Trying alternate stream..."));
                self.media.set_source(&backup_url);
                if immediate {
                    tracing::info!("Backup stream passed its last health check, switching now");
                    self.begin_attempt();
                } else {
                    self.schedule_retry(self.settings.backup_retry_delay);
                }
            }
            NextStep::Retry { attempt } => {
                self.notifier.notify(Notification::info(format!(
                    "Retrying connection... ({}/{})",
                    attempt, max_retries
                )));
                self.schedule_retry(self.settings.retry_delay);
            }
            NextStep::GiveUp { name } => {
                self.media.pause();
                self.media.reset_position();
                self.notifier.notify(Notification::error(format!(
                    "Could not play {}: {}",
                    name,
                    reason.user_message()
                )));
                self.publish();
            }
        }
    }

    fn schedule_retry(&mut self, delay: std::time::Duration) {
        self.retry_timer = Some(self.scheduler.schedule(
            delay,
            TimerEvent {
                kind: TimerKind::Retry,
                epoch: self.epoch,
            },
        ));
        self.publish();
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}
