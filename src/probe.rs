//! Stream health probes
//!
//! A probe answers one question: does the alternate stream look reachable
//! right now? Many radio servers refuse HEAD requests or hide their status
//! behind proxies, so anything that cannot be read cleanly is reported as
//! [`ProbeOutcome::Unknown`] rather than as a failure.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;

/// Result of probing a stream URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeOutcome {
    Reachable,
    Unreachable,
    /// The response could not be interpreted
    Unknown,
}

impl ProbeOutcome {
    pub fn is_reachable(self) -> bool {
        matches!(self, ProbeOutcome::Reachable)
    }
}

/// Lightweight existence check against a stream URL
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// HEAD-request probe over reqwest
pub struct HttpProbe {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let outcome = match self.client.head(url).timeout(self.timeout).send().await {
            Ok(response) => classify_status(response.status()),
            Err(e) if e.is_timeout() || e.is_connect() => ProbeOutcome::Unreachable,
            Err(e) => {
                tracing::debug!("Probe of {} inconclusive: {}", url, e);
                ProbeOutcome::Unknown
            }
        };

        tracing::debug!("Probe {} -> {:?}", url, outcome);
        outcome
    }
}

/// Interpret a HEAD response status
///
/// Servers that reject HEAD itself (405, 501) or deny the request (401, 403)
/// tell us nothing about the stream.
pub fn classify_status(status: StatusCode) -> ProbeOutcome {
    if status.is_success() || status.is_redirection() {
        return ProbeOutcome::Reachable;
    }

    match status {
        StatusCode::METHOD_NOT_ALLOWED
        | StatusCode::NOT_IMPLEMENTED
        | StatusCode::UNAUTHORIZED
        | StatusCode::FORBIDDEN => ProbeOutcome::Unknown,
        _ => ProbeOutcome::Unreachable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(StatusCode::OK), ProbeOutcome::Reachable);
        assert_eq!(classify_status(StatusCode::FOUND), ProbeOutcome::Reachable);
        assert_eq!(classify_status(StatusCode::METHOD_NOT_ALLOWED), ProbeOutcome::Unknown);
        assert_eq!(classify_status(StatusCode::FORBIDDEN), ProbeOutcome::Unknown);
        assert_eq!(classify_status(StatusCode::NOT_FOUND), ProbeOutcome::Unreachable);
        assert_eq!(classify_status(StatusCode::BAD_GATEWAY), ProbeOutcome::Unreachable);
    }

    #[tokio::test]
    async fn test_refused_connection_is_unreachable() {
        let probe = HttpProbe::new(reqwest::Client::new(), Duration::from_secs(2));
        assert_eq!(
            probe.probe("http://127.0.0.1:9/stream").await,
            ProbeOutcome::Unreachable
        );
    }

    #[tokio::test]
    async fn test_malformed_url_is_unknown() {
        let probe = HttpProbe::new(reqwest::Client::new(), Duration::from_secs(2));
        assert_eq!(probe.probe("not a url").await, ProbeOutcome::Unknown);
    }
}
