//! Ingestion boundary
//!
//! Accepts one raw payload per call, validates it, and appends accepted
//! payloads to the event log. Called concurrently, once per inbound request.

use crate::core::validator::validate;
use crate::io::EventLog;
use crate::types::{Event, LogError, RejectionReason};
use std::sync::Arc;

/// Result of ingesting one payload
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// Validated and durably appended
    Accepted(Event),

    /// Failed validation; nothing was written
    Rejected(RejectionReason),

    /// Valid, but the append failed; the caller may retry
    Failed(LogError),
}

/// Validates payloads and appends them to the event log
#[derive(Debug, Clone)]
pub struct IngestionService {
    log: Arc<EventLog>,
}

impl IngestionService {
    pub fn new(log: Arc<EventLog>) -> Self {
        Self { log }
    }

    /// Ingest one payload
    ///
    /// The payload is appended as received, minus surrounding whitespace, so
    /// the log keeps the producer's bytes. A payload spread over several
    /// lines is re-encoded compactly first since a record must fit on one
    /// line. One append per accepted call, no internal retries.
    pub async fn ingest(&self, raw: &[u8]) -> IngestOutcome {
        let event = match validate(raw) {
            Ok(event) => event,
            Err(reason) => {
                tracing::info!(%reason, "Event rejected");
                return IngestOutcome::Rejected(reason);
            }
        };

        let trimmed = raw.trim_ascii();
        let result = if trimmed.iter().any(|b| *b == b'\n' || *b == b'\r') {
            match compact(trimmed) {
                Ok(line) => self.log.append_line(&line).await,
                Err(e) => Err(e),
            }
        } else {
            self.log.append_line(trimmed).await
        };

        match result {
            Ok(()) => {
                tracing::debug!(
                    user_id = event.user_id(),
                    name = event.name().as_str(),
                    value = event.value(),
                    "Event saved"
                );
                IngestOutcome::Accepted(event)
            }
            Err(e) => {
                tracing::error!(error = %e, user_id = event.user_id(), "Event append failed");
                IngestOutcome::Failed(e)
            }
        }
    }
}

fn compact(payload: &[u8]) -> Result<Vec<u8>, LogError> {
    let value: serde_json::Value =
        serde_json::from_slice(payload).map_err(|e| LogError::InvalidRecord {
            message: e.to_string(),
        })?;
    serde_json::to_vec(&value).map_err(|e| LogError::InvalidRecord {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogConfig;
    use crate::io::event_log::collect_records;
    use rstest::rstest;
    use tempfile::TempDir;

    async fn service(dir: &TempDir) -> (IngestionService, Arc<EventLog>) {
        let config = LogConfig {
            path: dir.path().join("event_log.jsonl"),
            sync_on_append: false,
        };
        let log = Arc::new(EventLog::open(&config).await.unwrap());
        (IngestionService::new(Arc::clone(&log)), log)
    }

    async fn lines(log: &EventLog) -> Vec<Vec<u8>> {
        collect_records(log.read_all().await.unwrap())
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.raw.to_vec())
            .collect()
    }

    #[tokio::test]
    async fn test_accepts_and_keeps_original_bytes() {
        let dir = TempDir::new().unwrap();
        let (service, log) = service(&dir).await;

        let raw = br#"{"value": 100, "name": "add_revenue", "userId": "Bob"}"#;
        let outcome = service.ingest(raw).await;

        assert!(matches!(outcome, IngestOutcome::Accepted(ref e) if e.user_id() == "Bob"));
        assert_eq!(lines(&log).await, vec![raw.to_vec()]);
    }

    #[tokio::test]
    async fn test_trims_trailing_newline() {
        let dir = TempDir::new().unwrap();
        let (service, log) = service(&dir).await;

        let outcome = service
            .ingest(b"{\"userId\":\"a\",\"name\":\"add_revenue\",\"value\":1}\r\n")
            .await;

        assert!(matches!(outcome, IngestOutcome::Accepted(_)));
        assert_eq!(
            lines(&log).await,
            vec![br#"{"userId":"a","name":"add_revenue","value":1}"#.to_vec()]
        );
    }

    #[tokio::test]
    async fn test_multi_line_payload_is_compacted() {
        let dir = TempDir::new().unwrap();
        let (service, log) = service(&dir).await;

        let outcome = service
            .ingest(b"{\n  \"userId\": \"a\",\n  \"name\": \"add_revenue\",\n  \"value\": 5\n}")
            .await;

        assert!(matches!(outcome, IngestOutcome::Accepted(_)));
        let stored = lines(&log).await;
        assert_eq!(stored.len(), 1);
        assert_eq!(validate(&stored[0]).unwrap().value(), 5);
    }

    #[rstest]
    #[case::malformed(&b"{oops"[..])]
    #[case::missing_user(&br#"{"userId":"","name":"add_revenue","value":1}"#[..])]
    #[case::bad_name(&br#"{"userId":"u","name":"refund","value":1}"#[..])]
    #[case::negative(&br#"{"userId":"u","name":"add_revenue","value":-1}"#[..])]
    #[tokio::test]
    async fn test_rejections_do_not_write(#[case] raw: &[u8]) {
        let dir = TempDir::new().unwrap();
        let (service, log) = service(&dir).await;

        let outcome = service.ingest(raw).await;

        assert!(matches!(outcome, IngestOutcome::Rejected(_)));
        assert!(lines(&log).await.is_empty());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_append_failure_is_reported_as_failed() {
        let log = EventLog::open(&LogConfig {
            path: "/dev/full".into(),
            sync_on_append: false,
        })
        .await
        .unwrap();
        let service = IngestionService::new(Arc::new(log));

        let outcome = service
            .ingest(br#"{"userId":"a","name":"add_revenue","value":1}"#)
            .await;

        assert!(matches!(outcome, IngestOutcome::Failed(LogError::IoError { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ingestion() {
        let dir = TempDir::new().unwrap();
        let (service, log) = service(&dir).await;

        let mut tasks = Vec::new();
        for i in 0..100 {
            let service = service.clone();
            tasks.push(tokio::spawn(async move {
                let raw = format!(r#"{{"userId":"u{i}","name":"add_revenue","value":{i}}}"#);
                service.ingest(raw.as_bytes()).await
            }));
        }
        for task in tasks {
            assert!(matches!(task.await.unwrap(), IngestOutcome::Accepted(_)));
        }

        let stored = lines(&log).await;
        assert_eq!(stored.len(), 100);
        let mut users: Vec<String> = stored
            .iter()
            .map(|line| validate(line).unwrap().user_id().to_string())
            .collect();
        users.sort();
        users.dedup();
        assert_eq!(users.len(), 100);
    }
}
