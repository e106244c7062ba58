//! Replay client
//!
//! Resends previously captured event lines to a running server's
//! ingestion endpoint, one request per non-blank line, in file order. The
//! server applies its normal validation; this side only counts outcomes.
//! A replayed line is a new event as far as the server is concerned.

use crate::config::ReplayConfig;
use crate::types::{LedgerError, LogError};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Counts for one replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Requests sent
    pub sent: u64,

    /// 2xx responses
    pub accepted: u64,

    /// 4xx responses
    pub rejected: u64,

    /// 5xx responses and transport errors
    pub failed: u64,

    /// Blank lines not sent
    pub blank: u64,
}

/// HTTP client for the ingestion endpoint
#[derive(Debug, Clone)]
pub struct ReplayClient {
    client: reqwest::Client,
    url: String,
    secret: String,
}

impl ReplayClient {
    pub fn new(config: &ReplayConfig) -> Result<Self, LedgerError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            secret: config.shared_secret.clone(),
        })
    }

    /// Post one payload and return the response status
    pub async fn send(&self, payload: &str) -> Result<StatusCode, reqwest::Error> {
        let response = self
            .client
            .post(&self.url)
            .header(AUTHORIZATION, &self.secret)
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_owned())
            .send()
            .await?;

        Ok(response.status())
    }

    /// Replay every line of `path`
    ///
    /// Per-line failures are counted and the replay continues. A 401 stops
    /// the replay, since every later request would be refused as well.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the server refuses
    /// the shared secret.
    pub async fn replay_file(&self, path: &Path) -> Result<ReplaySummary, LedgerError> {
        let file = tokio::fs::File::open(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogError::NotFound {
                    path: path.display().to_string(),
                }
            } else {
                LogError::from(e)
            }
        })?;

        let mut lines = BufReader::new(file).lines();
        let mut summary = ReplaySummary::default();
        let mut line_number = 0u64;

        while let Some(line) = lines.next_line().await.map_err(LogError::from)? {
            line_number += 1;
            let payload = line.trim();
            if payload.is_empty() {
                summary.blank += 1;
                continue;
            }

            summary.sent += 1;
            match self.send(payload).await {
                Ok(status) if status.is_success() => {
                    summary.accepted += 1;
                    tracing::debug!(line = line_number, %status, "Event sent");
                }
                Ok(status) if status == StatusCode::UNAUTHORIZED => {
                    tracing::error!(line = line_number, url = %self.url, "Shared secret refused");
                    return Err(LedgerError::Http {
                        message: format!(
                            "{} refused the shared secret at line {line_number} ({} accepted before)",
                            self.url, summary.accepted
                        ),
                    });
                }
                Ok(status) if status.is_client_error() => {
                    summary.rejected += 1;
                    tracing::warn!(line = line_number, %status, content = payload, "Event rejected");
                }
                Ok(status) => {
                    summary.failed += 1;
                    tracing::error!(line = line_number, %status, content = payload, "Event not saved");
                }
                Err(error) => {
                    summary.failed += 1;
                    tracing::error!(line = line_number, %error, "Error sending event");
                }
            }
        }

        tracing::info!(
            sent = summary.sent,
            accepted = summary.accepted,
            rejected = summary.rejected,
            failed = summary.failed,
            blank = summary.blank,
            "All events sent"
        );
        Ok(summary)
    }
}
