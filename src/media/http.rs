//! Headless HTTP media element
//!
//! Connects to a stream URL with reqwest and consumes the body without
//! decoding it. Connection progress is translated into the same event set a
//! browser audio element produces, which makes this element usable for
//! unattended monitoring and for driving the player from a terminal.
//!
//! HLS playlists are fetched as plain documents; segment following is not
//! implemented, so an HLS source reports `Ended` once the playlist is read.

use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::{MediaElement, MediaErrorCode, MediaEvent, MediaEventSender};
use crate::constants;
use crate::error::MediaError;
use crate::source::StreamFormat;

/// Flags shared between the element and its reader task
#[derive(Debug, Default)]
struct ReaderFlags {
    ready: AtomicBool,
    playing: AtomicBool,
    bytes_received: AtomicU64,
}

/// Media element backed by a streaming HTTP GET
pub struct HttpMediaElement {
    client: reqwest::Client,
    events: MediaEventSender,
    source: Option<String>,
    reader: Option<JoinHandle<()>>,
    flags: Arc<ReaderFlags>,
    stall_threshold: Duration,
    volume: f32,
    muted: bool,
}

impl HttpMediaElement {
    pub fn new(client: reqwest::Client, events: MediaEventSender) -> Self {
        Self {
            client,
            events,
            source: None,
            reader: None,
            flags: Arc::new(ReaderFlags::default()),
            stall_threshold: constants::STALL_THRESHOLD,
            volume: 1.0,
            muted: false,
        }
    }

    pub fn with_stall_threshold(mut self, threshold: Duration) -> Self {
        self.stall_threshold = threshold;
        self
    }

    /// Bytes read from the current connection
    pub fn bytes_received(&self) -> u64 {
        self.flags.bytes_received.load(Ordering::Relaxed)
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    fn abort_reader(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.flags = Arc::new(ReaderFlags::default());
    }
}

impl MediaElement for HttpMediaElement {
    fn set_source(&mut self, url: &str) {
        self.abort_reader();
        self.events.advance();
        self.source = Some(url.to_string());
    }

    fn source(&self) -> Option<String> {
        self.source.clone()
    }

    fn load(&mut self) {
        self.abort_reader();

        let Some(url) = self.source.clone() else {
            self.events.emit(MediaEvent::Error(MediaErrorCode::SourceNotSupported));
            return;
        };

        let generation = self.events.generation();
        let reader = StreamReader {
            client: self.client.clone(),
            events: self.events.clone(),
            flags: self.flags.clone(),
            stall_threshold: self.stall_threshold,
            generation,
        };

        self.reader = Some(tokio::spawn(reader.run(url)));
    }

    fn play(&mut self) -> Result<(), MediaError> {
        if self.source.is_none() {
            return Err(MediaError::NoSource);
        }

        let was_playing = self.flags.playing.swap(true, Ordering::SeqCst);
        if !was_playing && self.flags.ready.load(Ordering::SeqCst) {
            self.events.emit(MediaEvent::Playing);
        }
        Ok(())
    }

    /// Live streams cannot be held; pausing drops the connection
    fn pause(&mut self) {
        let was_playing = self.flags.playing.swap(false, Ordering::SeqCst);
        self.abort_reader();
        if was_playing {
            self.events.emit(MediaEvent::Pause);
        }
    }

    fn reset_position(&mut self) {
        // A live stream has no seekable position; rewinding drops the
        // connection and the next load reconnects.
        self.abort_reader();
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        tracing::debug!("Headless volume set to {:.2}", self.volume);
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        tracing::debug!("Headless mute set to {}", muted);
    }
}

impl Drop for HttpMediaElement {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

/// Background task state for one connection
struct StreamReader {
    client: reqwest::Client,
    events: MediaEventSender,
    flags: Arc<ReaderFlags>,
    stall_threshold: Duration,
    generation: u64,
}

impl StreamReader {
    fn emit(&self, event: MediaEvent) {
        self.events.emit_for(self.generation, event);
    }

    async fn run(self, url: String) {
        self.emit(MediaEvent::LoadStart);

        let format = StreamFormat::detect(&url);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Connection to {} failed: {}", url, e);
                self.emit(MediaEvent::Error(MediaErrorCode::Network));
                return;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Stream {} answered {}", url, status);
            self.emit(MediaEvent::Error(error_code_for_status(status)));
            return;
        }

        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !format.accepts_content_type(content_type) {
                tracing::warn!("Stream {} has unsupported content type {}", url, content_type);
                self.emit(MediaEvent::Error(MediaErrorCode::SourceNotSupported));
                return;
            }
        }

        let mut body = response.bytes_stream();
        let mut stalled = false;

        loop {
            match tokio::time::timeout(self.stall_threshold, body.next()).await {
                Ok(Some(Ok(chunk))) => {
                    self.flags
                        .bytes_received
                        .fetch_add(chunk.len() as u64, Ordering::Relaxed);

                    if !self.flags.ready.swap(true, Ordering::SeqCst) {
                        self.emit(MediaEvent::CanPlay);
                    } else if stalled {
                        stalled = false;
                        self.emit(MediaEvent::Playing);
                    }
                }
                Ok(Some(Err(e))) => {
                    tracing::warn!("Stream {} interrupted: {}", url, e);
                    self.emit(MediaEvent::Error(MediaErrorCode::Network));
                    return;
                }
                Ok(None) => {
                    tracing::info!("Stream {} ended", url);
                    self.emit(MediaEvent::Ended);
                    return;
                }
                Err(_) => {
                    if !stalled {
                        stalled = true;
                        if self.flags.playing.load(Ordering::SeqCst) {
                            self.emit(MediaEvent::Waiting);
                        } else {
                            self.emit(MediaEvent::Stalled);
                        }
                    }
                }
            }
        }
    }
}

/// Map an unsuccessful HTTP status to a media error code
pub fn error_code_for_status(status: StatusCode) -> MediaErrorCode {
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE | StatusCode::UNSUPPORTED_MEDIA_TYPE => {
            MediaErrorCode::SourceNotSupported
        }
        _ => MediaErrorCode::Network,
    }
}
