//! Media primitive abstraction
//!
//! The player drives exactly one [`MediaElement`]. Elements report progress
//! asynchronously as [`MediaEvent`]s through a [`MediaEventSender`]. Every
//! event is stamped with the binding generation current at the time it was
//! emitted, and [`MediaEventReceiver`] drops events that belong to an older
//! binding, so a connection torn down by a source change can never affect
//! the next one.

pub mod http;
pub mod mock;

pub use http::HttpMediaElement;
pub use mock::MockMediaElement;

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::MediaError;

/// Coded reason attached to a media error event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaErrorCode {
    /// Fetch was aborted
    Aborted,
    /// Network failure while loading or playing
    Network,
    /// Data could not be decoded
    Decode,
    /// The resource or its format is not usable
    SourceNotSupported,
}

impl MediaErrorCode {
    /// Message suitable for a listener-facing notification
    pub fn user_message(self) -> &'static str {
        match self {
            MediaErrorCode::Network => "Network error. Check your internet connection.",
            MediaErrorCode::SourceNotSupported => "Audio format not supported by this station.",
            MediaErrorCode::Aborted => "Playback was cancelled.",
            MediaErrorCode::Decode => "Unknown playback error.",
        }
    }
}

/// Events reported by a media element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    LoadStart,
    CanPlay,
    CanPlayThrough,
    Playing,
    Pause,
    Waiting,
    Stalled,
    Ended,
    Error(MediaErrorCode),
}

/// A single audio-capable playback primitive
///
/// Calls never block: `load` starts fetching in the background and the
/// outcome arrives later as events.
pub trait MediaElement: Send {
    /// Bind a new source address, invalidating events of the old one
    fn set_source(&mut self, url: &str);

    /// Currently bound address
    fn source(&self) -> Option<String>;

    /// Begin loading the bound source
    fn load(&mut self);

    /// Start playback of a loaded source
    fn play(&mut self) -> Result<(), MediaError>;

    fn pause(&mut self);

    /// Rewind to the start, dropping any buffered data
    fn reset_position(&mut self);

    /// Volume in the range 0.0..=1.0
    fn set_volume(&mut self, volume: f32);

    fn set_muted(&mut self, muted: bool);
}

#[derive(Debug)]
struct Stamped {
    generation: u64,
    event: MediaEvent,
}

/// Sending half of a media event channel, owned by the element
#[derive(Debug, Clone)]
pub struct MediaEventSender {
    tx: mpsc::UnboundedSender<Stamped>,
    generation: Arc<AtomicU64>,
}

impl MediaEventSender {
    /// Start a new binding generation and return it
    pub fn advance(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Current binding generation
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Emit an event for the current generation
    pub fn emit(&self, event: MediaEvent) {
        self.emit_for(self.generation(), event);
    }

    /// Emit an event on behalf of a specific generation
    ///
    /// Background readers capture their generation when spawned and use
    /// this, so anything they report after a rebind is discarded.
    pub fn emit_for(&self, generation: u64, event: MediaEvent) {
        // Receiver gone means the player shut down
        let _ = self.tx.send(Stamped { generation, event });
    }
}

/// Receiving half of a media event channel, read by the player runtime
#[derive(Debug)]
pub struct MediaEventReceiver {
    rx: mpsc::UnboundedReceiver<Stamped>,
    generation: Arc<AtomicU64>,
}

impl MediaEventReceiver {
    /// Next event of the current binding, skipping stale ones
    pub async fn recv(&mut self) -> Option<MediaEvent> {
        loop {
            let stamped = self.rx.recv().await?;
            if stamped.generation == self.generation.load(Ordering::SeqCst) {
                return Some(stamped.event);
            }
            tracing::trace!(
                "Dropping stale media event {:?} from generation {}",
                stamped.event,
                stamped.generation
            );
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv)
    pub fn try_recv(&mut self) -> Option<MediaEvent> {
        while let Ok(stamped) = self.rx.try_recv() {
            if stamped.generation == self.generation.load(Ordering::SeqCst) {
                return Some(stamped.event);
            }
        }
        None
    }
}

/// Create a generation-aware media event channel
pub fn media_event_channel() -> (MediaEventSender, MediaEventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let generation = Arc::new(AtomicU64::new(0));
    (
        MediaEventSender {
            tx,
            generation: generation.clone(),
        },
        MediaEventReceiver { rx, generation },
    )
}
