//! Reconciliation engine
//!
//! Drives one batch run: checkpoint → aggregation pass → additive upsert →
//! checkpoint. The range being reconciled is written as `pending` before any
//! balance is touched, and the committed offset only advances once every
//! user in that range has been applied (or was already applied). A crash or
//! a partial failure therefore leaves the same range to be retried, and the
//! per-user batch claims keep the retry from adding anything twice.
//!
//! Batch ids are scoped to the log through the id kept in its checkpoint, so
//! a new log (or a reset checkpoint) never collides with claims left by an
//! earlier one. A user whose net delta does not fit in a balance is reported
//! as failed, which also keeps the range pending.

use crate::core::aggregator::AggregationStats;
use crate::core::checkpoint::{Checkpoint, LogRange};
use crate::core::reconciler::{ReconcileReport, Reconciler};
use crate::io::event_log::log_len;
use crate::strategy::{aggregate_range, AggregationStrategy};
use crate::types::LedgerError;
use std::path::PathBuf;

/// Result of one [`ReconciliationEngine::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Byte range of the log this run covered
    pub range: LogRange,

    /// True if the range was left over from an earlier incomplete run
    pub retried: bool,

    pub stats: AggregationStats,
    pub report: ReconcileReport,

    /// Checkpoint after the run
    pub checkpoint: Checkpoint,
}

impl RunSummary {
    /// True when the checkpoint advanced past `range`
    pub fn is_committed(&self) -> bool {
        self.checkpoint.pending.is_none() && self.checkpoint.committed_offset >= self.range.end
    }
}

/// Batch driver for aggregation and reconciliation
pub struct ReconciliationEngine {
    strategy: Box<dyn AggregationStrategy>,
    reconciler: Reconciler,
    log_path: PathBuf,
    checkpoint_path: PathBuf,
}

impl ReconciliationEngine {
    pub fn new(
        strategy: Box<dyn AggregationStrategy>,
        reconciler: Reconciler,
        log_path: impl Into<PathBuf>,
        checkpoint_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            strategy,
            reconciler,
            log_path: log_path.into(),
            checkpoint_path: checkpoint_path.into(),
        }
    }

    /// Reconcile everything appended since the last committed run
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint cannot be read or written, if it
    /// points past the end of the log, or if the log cannot be read. Per-user
    /// store failures are not errors; they show up in the report and leave
    /// the range pending.
    pub async fn run(&self) -> Result<RunSummary, LedgerError> {
        let mut checkpoint = Checkpoint::load(&self.checkpoint_path).await?;
        let len = log_len(&self.log_path).await?;
        let planned = checkpoint.next_range(len)?;
        let retried = checkpoint.pending.is_some();

        let aggregation = aggregate_range(
            self.strategy.as_ref(),
            &self.log_path,
            planned.start,
            Some(planned.end),
        )
        .await?;

        // A partial trailing line is not part of the range
        let range = LogRange {
            start: planned.start,
            end: aggregation.end_offset,
        };

        tracing::info!(
            start = range.start,
            end = range.end,
            retried,
            lines = aggregation.stats.total_lines,
            applied_lines = aggregation.stats.applied_lines(),
            skipped = aggregation.stats.skipped_lines,
            users = aggregation.deltas.len(),
            overflowed_users = aggregation.stats.overflowed_users,
            "Aggregation pass complete"
        );

        if range.is_empty() {
            tracing::info!(offset = range.start, "No new events to reconcile");
            return Ok(RunSummary {
                range,
                retried,
                stats: aggregation.stats,
                report: ReconcileReport::default(),
                checkpoint,
            });
        }

        let batch = checkpoint.batch_id(range);
        checkpoint.pending = Some(range);
        checkpoint.store(&self.checkpoint_path).await?;

        let mut report = self.reconciler.reconcile(&batch, &aggregation.deltas).await;
        report.record_overflow(&aggregation.overflowed);

        if report.is_complete() {
            checkpoint.committed_offset = range.end;
            checkpoint.pending = None;
            checkpoint.store(&self.checkpoint_path).await?;
            tracing::info!(
                %batch,
                applied = report.applied(),
                already_applied = report.already_applied(),
                committed_offset = range.end,
                "Reconciliation committed"
            );
        } else {
            tracing::warn!(
                %batch,
                applied = report.applied(),
                failed = report.failed(),
                "Reconciliation incomplete, range left pending for retry"
            );
        }

        Ok(RunSummary {
            range,
            retried,
            stats: aggregation.stats,
            report,
            checkpoint,
        })
    }
}
