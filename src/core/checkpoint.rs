//! Durable reconciliation checkpoint
//!
//! Records how far into the event log balances have been reconciled, plus
//! the range of a run that has started but not fully succeeded. Stored as
//! JSON next to the log and replaced atomically (write temp file, fsync,
//! rename) so a crash leaves either the old or the new checkpoint.

use crate::types::{BatchId, LedgerError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Byte range of a reconciliation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRange {
    pub start: u64,
    pub end: u64,
}

impl LogRange {
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Everything before this offset is reflected in the balances
    pub committed_offset: u64,

    /// Range of a run that did not complete; the next run retries it as is
    pub pending: Option<LogRange>,

    /// Identity of the log this checkpoint tracks; scopes every batch id
    #[serde(default)]
    pub log_id: Option<Uuid>,
}

impl Checkpoint {
    /// Load the checkpoint; a missing file means nothing was reconciled yet
    pub async fn load(path: &Path) -> Result<Self, LedgerError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                LedgerError::checkpoint(format!("{} is corrupt: {e}", path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(LedgerError::checkpoint(format!(
                "cannot read {}: {e}",
                path.display()
            ))),
        }
    }

    /// Atomically replace the checkpoint file
    pub async fn store(&self, path: &Path) -> Result<(), LedgerError> {
        let bytes = serde_json::to_vec(self).map_err(LedgerError::checkpoint)?;
        let tmp = temp_path(path);

        let write = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(&bytes).await?;
            file.sync_all().await?;
            tokio::fs::rename(&tmp, path).await
        };

        write.await.map_err(|e: std::io::Error| {
            LedgerError::checkpoint(format!("cannot write {}: {e}", path.display()))
        })
    }

    /// Batch id for `range`, assigning the log id on first use
    ///
    /// The id only becomes durable once the checkpoint is stored.
    pub fn batch_id(&mut self, range: LogRange) -> BatchId {
        let log_id = *self.log_id.get_or_insert_with(Uuid::new_v4);
        BatchId::new(log_id, range.start, range.end)
    }

    /// Range the next run should reconcile, given the current log length
    pub fn next_range(&self, log_len: u64) -> Result<LogRange, LedgerError> {
        if let Some(pending) = self.pending {
            if pending.end > log_len {
                return Err(LedgerError::checkpoint(format!(
                    "pending range {}-{} extends past log length {log_len}",
                    pending.start, pending.end
                )));
            }
            return Ok(pending);
        }

        if self.committed_offset > log_len {
            return Err(LedgerError::checkpoint(format!(
                "committed offset {} is beyond log length {log_len}; was the log rotated?",
                self.committed_offset
            )));
        }

        Ok(LogRange {
            start: self.committed_offset,
            end: log_len,
        })
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
