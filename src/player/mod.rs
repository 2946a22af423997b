//! Playback control
//!
//! [`StreamPlaybackController`] is the synchronous failover state machine;
//! [`spawn_player`] runs one on a tokio task and hands out [`PlayerHandle`]s.

pub mod controller;
pub mod runtime;
pub mod state;
pub mod timer;

pub use controller::{FailureReason, ProbeReport, ProbeRequest, StreamPlaybackController};
pub use runtime::{spawn_player, PlayerCommand, PlayerHandle};
pub use state::{PlaybackState, PlayerSettings, PlayerSnapshot};
pub use timer::{ManualScheduler, Scheduler, TimerEvent, TimerHandle, TimerKind, TokioScheduler};
