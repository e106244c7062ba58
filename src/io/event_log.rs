//! Append-only, newline-delimited event log
//!
//! One JSON event per line, in arrival order. This module never deletes,
//! truncates or rewrites records; rotation is someone else's job.
//!
//! # Concurrency
//!
//! All appends from this process go through one file handle opened in
//! append mode and guarded by an async mutex. Each record is written with a
//! single `write_all` of the full line (terminator included) while the lock
//! is held, so concurrent appenders are totally ordered at the byte level
//! and never interleave inside a line.
//!
//! Readers open their own handle and never take the lock. A reader that
//! races an appender may see a partial last line; the [`LogLineCodec`]
//! holds it back until its `\n` lands.
//!
//! # Torn writes
//!
//! A write that fails partway, or whose future is dropped between chunks,
//! can leave an unterminated fragment at the end of the file. The writer
//! remembers that its last write did not complete and starts the next
//! record with a `\n`, which closes the fragment off as a line of its own
//! (skipped as malformed by the aggregator) instead of gluing the next
//! record onto it.

use crate::config::LogConfig;
use crate::io::line_codec::{LogLineCodec, LogRecord};
use crate::types::{Event, LogError};
use futures::stream::{BoxStream, StreamExt};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_util::codec::FramedRead;

/// Stream of complete log records
pub type RecordStream = BoxStream<'static, Result<LogRecord, LogError>>;

/// Writer handle for the durable event log
///
/// Share it behind an `Arc`; `append` takes `&self`.
#[derive(Debug)]
pub struct EventLog {
    path: PathBuf,
    writer: Mutex<LogWriter>,
    sync_on_append: bool,
}

#[derive(Debug)]
struct LogWriter {
    file: File,

    /// Set while a write is in flight; still set afterwards if it failed or
    /// was cancelled
    unterminated: bool,
}

impl EventLog {
    /// Open the log for appending, creating the file if needed
    pub async fn open(config: &LogConfig) -> Result<Self, LogError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)
            .await?;

        tracing::debug!(path = %config.path.display(), "Event log opened");

        Ok(Self {
            path: config.path.clone(),
            writer: Mutex::new(LogWriter {
                file,
                unterminated: false,
            }),
            sync_on_append: config.sync_on_append,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize an event and append it as one record
    pub async fn append(&self, event: &Event) -> Result<(), LogError> {
        let line = serde_json::to_vec(event).map_err(|e| LogError::InvalidRecord {
            message: e.to_string(),
        })?;
        self.append_line(&line).await
    }

    /// Append pre-serialized bytes as one record
    ///
    /// The payload must not contain a line break; the terminating `\n` is
    /// added here.
    pub async fn append_line(&self, payload: &[u8]) -> Result<(), LogError> {
        if payload.iter().any(|b| *b == b'\n' || *b == b'\r') {
            return Err(LogError::InvalidRecord {
                message: "record contains a line break".to_string(),
            });
        }

        let mut writer = self.writer.lock().await;

        let mut record = Vec::with_capacity(payload.len() + 2);
        if writer.unterminated {
            tracing::warn!(
                path = %self.path.display(),
                "Previous append did not complete, terminating its fragment"
            );
            record.push(b'\n');
        }
        record.extend_from_slice(payload);
        record.push(b'\n');

        writer.unterminated = true;
        writer.file.write_all(&record).await?;
        writer.file.flush().await?;
        writer.unterminated = false;

        if self.sync_on_append {
            writer.file.sync_data().await?;
        }

        Ok(())
    }

    /// Start a fresh pass over every complete record
    pub async fn read_all(&self) -> Result<RecordStream, LogError> {
        read_range(&self.path, 0, None).await
    }
}

/// Read complete records starting at byte `start`
///
/// With `end` set, the stream stops before the first record that extends
/// past it. `start` must sit on a record boundary.
pub async fn read_range(path: &Path, start: u64, end: Option<u64>) -> Result<RecordStream, LogError> {
    let mut file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(LogError::NotFound {
                path: path.display().to_string(),
            })
        }
        Err(e) => return Err(e.into()),
    };

    if start > 0 {
        file.seek(SeekFrom::Start(start)).await?;
    }

    let records = FramedRead::new(file, LogLineCodec::new(start));

    Ok(match end {
        None => records.boxed(),
        Some(end) => records
            .take_while(move |item| {
                let keep = match item {
                    Ok(record) => record.end_offset <= end,
                    Err(_) => true,
                };
                futures::future::ready(keep)
            })
            .boxed(),
    })
}

/// Length of the log file in bytes, zero when it does not exist yet
pub async fn log_len(path: &Path) -> Result<u64, LogError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// Collect every record of a stream, failing on the first read error
pub async fn collect_records(mut records: RecordStream) -> Result<Vec<LogRecord>, LogError> {
    let mut collected = Vec::new();
    while let Some(item) = records.next().await {
        collected.push(item?);
    }
    Ok(collected)
}
