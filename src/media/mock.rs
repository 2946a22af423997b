//! Scriptable in-memory media element
//!
//! Records every call the player makes and lets the caller inject events.
//! Clones share state, so a test can hand one clone to the player and keep
//! another to inspect and drive it.

use parking_lot::Mutex;
use std::sync::Arc;

use super::{MediaElement, MediaErrorCode, MediaEvent, MediaEventSender};
use crate::error::MediaError;

/// Everything the mock has been asked to do
#[derive(Debug, Clone, Default)]
pub struct MockState {
    pub source: Option<String>,
    /// Source address at the time of each `load` call
    pub loads: Vec<String>,
    pub play_calls: usize,
    pub pause_calls: usize,
    pub position_resets: usize,
    pub volume: f32,
    pub muted: bool,
    pub playing: bool,
    /// When set, the next `play` call fails
    pub reject_next_play: Option<String>,
}

/// Media element that plays nothing and remembers everything
#[derive(Debug, Clone)]
pub struct MockMediaElement {
    state: Arc<Mutex<MockState>>,
    events: MediaEventSender,
}

impl MockMediaElement {
    pub fn new(events: MediaEventSender) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                volume: 1.0,
                ..MockState::default()
            })),
            events,
        }
    }

    /// Copy of the recorded state
    pub fn state(&self) -> MockState {
        self.state.lock().clone()
    }

    pub fn current_source(&self) -> Option<String> {
        self.state.lock().source.clone()
    }

    pub fn load_count(&self) -> usize {
        self.state.lock().loads.len()
    }

    /// Make the next `play` call fail with the given reason
    pub fn reject_next_play(&self, reason: impl Into<String>) {
        self.state.lock().reject_next_play = Some(reason.into());
    }

    /// Inject an event for the current binding
    pub fn emit(&self, event: MediaEvent) {
        self.events.emit(event);
    }

    /// Inject an error event for the current binding
    pub fn fail(&self, code: MediaErrorCode) {
        self.emit(MediaEvent::Error(code));
    }
}

impl MediaElement for MockMediaElement {
    fn set_source(&mut self, url: &str) {
        self.events.advance();
        let mut state = self.state.lock();
        state.source = Some(url.to_string());
        state.playing = false;
    }

    fn source(&self) -> Option<String> {
        self.current_source()
    }

    fn load(&mut self) {
        let mut state = self.state.lock();
        if let Some(source) = state.source.clone() {
            state.loads.push(source);
        }
    }

    fn play(&mut self) -> Result<(), MediaError> {
        let mut state = self.state.lock();
        state.play_calls += 1;

        if state.source.is_none() {
            return Err(MediaError::NoSource);
        }
        if let Some(reason) = state.reject_next_play.take() {
            return Err(MediaError::PlayRejected(reason));
        }

        state.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        let mut state = self.state.lock();
        state.pause_calls += 1;
        state.playing = false;
    }

    fn reset_position(&mut self) {
        self.state.lock().position_resets += 1;
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.lock().volume = volume;
    }

    fn set_muted(&mut self, muted: bool) {
        self.state.lock().muted = muted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::media_event_channel;

    #[test]
    fn test_mock_records_calls() {
        let (tx, _rx) = media_event_channel();
        let mock = MockMediaElement::new(tx);
        let mut element = mock.clone();

        assert_eq!(element.source(), None);
        element.set_source("https://a.example/stream");
        assert_eq!(element.source().as_deref(), Some("https://a.example/stream"));
        element.load();
        element.play().unwrap();
        element.pause();
        element.reset_position();

        let state = mock.state();
        assert_eq!(state.loads, vec!["https://a.example/stream".to_string()]);
        assert_eq!(state.play_calls, 1);
        assert_eq!(state.pause_calls, 1);
        assert_eq!(state.position_resets, 1);
        assert!(!state.playing);
    }

    #[test]
    fn test_play_without_source_fails() {
        let (tx, _rx) = media_event_channel();
        let mut mock = MockMediaElement::new(tx);
        assert_eq!(mock.play(), Err(MediaError::NoSource));
    }

    #[test]
    fn test_rebinding_invalidates_pending_events() {
        let (tx, mut rx) = media_event_channel();
        let mock = MockMediaElement::new(tx);
        let mut element = mock.clone();

        element.set_source("https://a.example/stream");
        mock.fail(MediaErrorCode::Network);
        element.set_source("https://b.example/stream");
        mock.emit(MediaEvent::CanPlay);

        assert_eq!(rx.try_recv(), Some(MediaEvent::CanPlay));
        assert_eq!(rx.try_recv(), None);
    }
}
