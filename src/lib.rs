//! # Radio Failover
//!
//! Resilient playback of community radio streams with a primary and an
//! optional backup URL per station.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                               CALLERS                                     │
//! │   ┌──────────────┐    ┌──────────────┐    ┌───────────────────────────┐   │
//! │   │  CLI (bin)   │    │  Web UI (ui) │    │  Station catalog (source) │   │
//! │   └──────┬───────┘    └──────┬───────┘    └─────────────┬─────────────┘   │
//! │          └───────────────────┼──────────────────────────┘                 │
//! │                              ▼                                            │
//! │                 PlayerHandle (player::runtime)                            │
//! └──────────────────────────────┼────────────────────────────────────────────┘
//!                                │ PlayerCommand (mpsc)
//!                                ▼
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                       PLAYER TASK (tokio::select!)                        │
//! │                                                                           │
//! │   commands ──┐   media events ──┐   timers ──┐   probe reports ──┐        │
//! │              ▼                  ▼            ▼                   ▼        │
//! │   ┌─────────────────────────────────────────────────────────────────┐     │
//! │   │           StreamPlaybackController (player::controller)         │     │
//! │   │   Idle ─► Loading ─► Playing ◄─► Buffering       Paused  Error  │     │
//! │   │   primary ──error/timeout──► backup ──► retry same URL ──► give up    │
//! │   └───────┬──────────────────┬──────────────────┬──────────────┬────┘     │
//! │           ▼                  ▼                  ▼              ▼          │
//! │   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐  ┌──────────┐    │
//! │   │ MediaElement │   │  Scheduler   │   │ HealthProbe  │  │ Notifier │    │
//! │   │   (media)    │   │   (timer)    │   │   (probe)    │  │ (notify) │    │
//! │   └──────┬───────┘   └──────────────┘   └──────┬───────┘  └────┬─────┘    │
//! └──────────┼─────────────────────────────────────┼───────────────┼──────────┘
//!            ▼                                     ▼               ▼
//!     HTTP stream (GET)                     HEAD probe       log / WebSocket
//! ```

pub mod config;
pub mod error;
pub mod media;
pub mod notify;
pub mod player;
pub mod probe;
pub mod source;
#[cfg(feature = "web-ui")]
pub mod ui;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    use std::time::Duration;

    /// Total connection attempts per play request
    pub const MAX_RETRIES: u32 = 3;

    /// Time allowed for a stream to become playable
    pub const LOAD_TIMEOUT: Duration = Duration::from_secs(15);

    /// Delay before switching to the backup URL
    pub const BACKUP_RETRY_DELAY: Duration = Duration::from_secs(1);

    /// Delay before retrying the same URL
    pub const RETRY_DELAY: Duration = Duration::from_secs(3);

    /// Interval between health probes of the alternate URL
    pub const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

    /// Client-side timeout of a single health probe
    pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Gap in stream data after which playback counts as stalled
    pub const STALL_THRESHOLD: Duration = Duration::from_secs(5);

    /// Starting volume (0-100)
    pub const DEFAULT_VOLUME: u8 = 80;

    /// Default HTTP port for the web UI
    pub const DEFAULT_HTTP_PORT: u16 = 8080;

    pub const USER_AGENT: &str = concat!("radio-failover/", env!("CARGO_PKG_VERSION"));

    /// Capacity of the notification broadcast channel
    pub const NOTIFICATION_CAPACITY: usize = 64;
}
