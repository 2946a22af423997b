//! Error types for the radio player

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Player is no longer running")]
    PlayerClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stream source validation errors
///
/// Raised synchronously by `select_and_play` before any session state is
/// touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Source {0} has no primary stream URL")]
    MissingPrimaryUrl(String),

    #[error("Source has an empty id")]
    MissingId,

    #[error("Invalid stream URL for {id}: {url}")]
    InvalidUrl { id: String, url: String },
}

/// Station catalog errors
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Duplicate station id: {0}")]
    DuplicateId(String),

    #[error("Invalid station {id}: {reason}")]
    InvalidStation { id: String, reason: String },
}

/// Media primitive errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("No source bound to the media element")]
    NoSource,

    #[error("Playback rejected: {0}")]
    PlayRejected(String),

    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
