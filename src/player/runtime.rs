//! Async player runtime
//!
//! Wraps a [`StreamPlaybackController`] in a tokio task. Commands from any
//! number of [`PlayerHandle`]s, media events, elapsed timers and finished
//! health probes are all funnelled into one `select!` loop, so the
//! controller only ever sees one input at a time.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::controller::{ProbeReport, ProbeRequest, StreamPlaybackController};
use super::state::{PlayerSettings, PlayerSnapshot};
use super::timer::{TimerEvent, TokioScheduler};
use crate::error::{Error, Result, SourceError};
use crate::media::{MediaElement, MediaEventReceiver};
use crate::notify::Notifier;
use crate::probe::HealthProbe;
use crate::source::StreamSource;

/// Pending commands before senders start waiting
const COMMAND_QUEUE: usize = 32;

/// Commands accepted by the player task
#[derive(Debug)]
pub enum PlayerCommand {
    SelectAndPlay {
        source: StreamSource,
        reply: oneshot::Sender<std::result::Result<(), SourceError>>,
    },
    TogglePlayPause,
    SetVolume(u8),
    ToggleMute,
    Stop,
    Shutdown,
}

/// Cloneable control handle for a running player
#[derive(Clone)]
pub struct PlayerHandle {
    cmd_tx: mpsc::Sender<PlayerCommand>,
    snapshot_rx: watch::Receiver<PlayerSnapshot>,
}

impl PlayerHandle {
    /// Select a station and start it; returns once the source was accepted
    pub async fn select_and_play(&self, source: StreamSource) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(PlayerCommand::SelectAndPlay { source, reply }).await?;
        rx.await.map_err(|_| Error::PlayerClosed)??;
        Ok(())
    }

    pub async fn toggle_play_pause(&self) -> Result<()> {
        self.send(PlayerCommand::TogglePlayPause).await
    }

    pub async fn set_volume(&self, level: u8) -> Result<()> {
        self.send(PlayerCommand::SetVolume(level)).await
    }

    pub async fn toggle_mute(&self) -> Result<()> {
        self.send(PlayerCommand::ToggleMute).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.send(PlayerCommand::Stop).await
    }

    /// Stop playback and end the player task
    pub async fn shutdown(&self) -> Result<()> {
        self.send(PlayerCommand::Shutdown).await
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> PlayerSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlayerSnapshot> {
        self.snapshot_rx.clone()
    }

    async fn send(&self, cmd: PlayerCommand) -> Result<()> {
        self.cmd_tx.send(cmd).await.map_err(|_| Error::PlayerClosed)
    }
}

/// Start a player task driving `media`
///
/// `events` must be the receiving half of the channel whose sender was given
/// to `media`. Must be called from within a tokio runtime.
pub fn spawn_player<M>(
    media: M,
    events: MediaEventReceiver,
    probe: Arc<dyn HealthProbe>,
    notifier: Arc<dyn Notifier>,
    settings: PlayerSettings,
) -> (PlayerHandle, JoinHandle<()>)
where
    M: MediaElement + 'static,
{
    let (timer_tx, timer_rx) = mpsc::unbounded_channel();
    let controller =
        StreamPlaybackController::new(media, TokioScheduler::new(timer_tx), notifier, settings);
    let snapshot_rx = controller.subscribe();
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_QUEUE);

    let task = tokio::spawn(run_player(controller, cmd_rx, events, timer_rx, probe));

    (PlayerHandle { cmd_tx, snapshot_rx }, task)
}

async fn run_player<M: MediaElement>(
    mut controller: StreamPlaybackController<M, TokioScheduler>,
    mut cmd_rx: mpsc::Receiver<PlayerCommand>,
    mut events: MediaEventReceiver,
    mut timer_rx: mpsc::UnboundedReceiver<TimerEvent>,
    probe: Arc<dyn HealthProbe>,
) {
    let (probe_tx, mut probe_rx) = mpsc::unbounded_channel::<ProbeReport>();
    tracing::info!("Player task started");

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(PlayerCommand::Shutdown) | None => break,
                Some(cmd) => apply_command(&mut controller, cmd),
            },
            Some(event) = events.recv() => {
                tracing::trace!("Media event: {:?}", event);
                controller.handle_media_event(event);
            }
            Some(timer) = timer_rx.recv() => {
                if let Some(request) = controller.handle_timer(timer) {
                    spawn_probe(probe.clone(), request, probe_tx.clone());
                }
            }
            Some(report) = probe_rx.recv() => {
                controller.handle_probe_result(report);
            }
        }
    }

    controller.stop();
    tracing::info!("Player task stopped");
}

fn apply_command<M: MediaElement>(
    controller: &mut StreamPlaybackController<M, TokioScheduler>,
    cmd: PlayerCommand,
) {
    match cmd {
        PlayerCommand::SelectAndPlay { source, reply } => {
            let result = controller.select_and_play(source);
            if let Err(ref e) = result {
                tracing::warn!("Rejected source: {}", e);
            }
            let _ = reply.send(result);
        }
        PlayerCommand::TogglePlayPause => controller.toggle_play_pause(),
        PlayerCommand::SetVolume(level) => controller.set_volume(level),
        PlayerCommand::ToggleMute => controller.toggle_mute(),
        PlayerCommand::Stop => controller.stop(),
        PlayerCommand::Shutdown => {}
    }
}

fn spawn_probe(
    probe: Arc<dyn HealthProbe>,
    request: ProbeRequest,
    tx: mpsc::UnboundedSender<ProbeReport>,
) {
    tokio::spawn(async move {
        let outcome = probe.probe(&request.url).await;
        let _ = tx.send(request.complete(outcome));
    });
}
