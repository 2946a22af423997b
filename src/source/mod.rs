//! Stream sources and the station catalog

pub mod catalog;

pub use catalog::{Category, StationCatalog, StationRecord};

use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// Which of a source's URLs is bound to the media element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlKind {
    Primary,
    Backup,
}

impl UrlKind {
    /// The other URL kind
    pub fn alternate(self) -> Self {
        match self {
            UrlKind::Primary => UrlKind::Backup,
            UrlKind::Backup => UrlKind::Primary,
        }
    }
}

impl std::fmt::Display for UrlKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UrlKind::Primary => f.write_str("primary"),
            UrlKind::Backup => f.write_str("backup"),
        }
    }
}

/// A playable station or channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSource {
    /// Opaque identifier, unique per source
    pub id: String,
    /// Main stream address
    pub primary_url: String,
    /// Fallback stream address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_url: Option<String>,
    /// Label shown to listeners
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl StreamSource {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        primary_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            primary_url: primary_url.into(),
            backup_url: None,
            display_name: display_name.into(),
            category: None,
            region: None,
        }
    }

    /// Attach a fallback stream
    pub fn with_backup(mut self, backup_url: impl Into<String>) -> Self {
        self.backup_url = Some(backup_url.into());
        self
    }

    /// Backup URL, if present and not blank
    pub fn backup(&self) -> Option<&str> {
        self.backup_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Whether a usable backup URL exists
    pub fn has_backup(&self) -> bool {
        self.backup().is_some()
    }

    /// URL for the given kind
    ///
    /// Falls back to the primary URL when asked for a backup that does not
    /// exist.
    pub fn url_for(&self, kind: UrlKind) -> &str {
        match kind {
            UrlKind::Primary => self.primary_url.trim(),
            UrlKind::Backup => self.backup().unwrap_or_else(|| self.primary_url.trim()),
        }
    }

    /// Check the source before any playback state is touched
    pub fn validate(&self) -> Result<(), SourceError> {
        if self.id.trim().is_empty() {
            return Err(SourceError::MissingId);
        }

        let primary = self.primary_url.trim();
        if primary.is_empty() {
            return Err(SourceError::MissingPrimaryUrl(self.id.clone()));
        }
        validate_stream_url(&self.id, primary)?;

        if let Some(backup) = self.backup() {
            validate_stream_url(&self.id, backup)?;
        }

        Ok(())
    }
}

fn validate_stream_url(id: &str, url: &str) -> Result<(), SourceError> {
    let invalid = || SourceError::InvalidUrl {
        id: id.to_string(),
        url: url.to_string(),
    };

    let parsed = reqwest::Url::parse(url).map_err(|_| invalid())?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(invalid()),
    }
}

/// Container hint derived from a stream URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormat {
    /// HTTP Live Streaming playlist (.m3u8 / .m3u)
    Hls,
    /// Continuous progressive stream (Icecast, Shoutcast, plain file)
    Progressive,
}

impl StreamFormat {
    /// Classify a URL by its path extension
    pub fn detect(url: &str) -> Self {
        let path = url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();

        if path.ends_with(".m3u8") || path.ends_with(".m3u") {
            StreamFormat::Hls
        } else {
            StreamFormat::Progressive
        }
    }

    /// Whether a response content type is acceptable for this format
    pub fn accepts_content_type(self, content_type: &str) -> bool {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if mime.starts_with("audio/") || mime == "application/octet-stream" || mime == "application/ogg" {
            return true;
        }

        match self {
            StreamFormat::Hls => {
                mime == "application/vnd.apple.mpegurl"
                    || mime == "application/x-mpegurl"
                    || mime == "text/plain"
            }
            StreamFormat::Progressive => false,
        }
    }
}
