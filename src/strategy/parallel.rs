//! Parallel batch aggregation strategy
//!
//! This module provides a multi-task implementation of the
//! AggregationStrategy trait. Records are read in batches; each batch is
//! folded on its own tokio task straight into a shared concurrent map.
//!
//! # Architecture
//!
//! ```text
//! ParallelAggregation
//!     ├── BatchConfig (batch_size, max_concurrent)
//!     ├── RecordStream → chunks(batch_size)
//!     ├── tokio::spawn per batch, at most max_concurrent in flight
//!     └── Arc<DashMap<user, i128>> (shared running totals)
//! ```
//!
//! Summation is commutative and totals are kept wide until the end, so the
//! order in which batches finish does not affect the result.

use crate::core::aggregator::{classify, finish_totals, Aggregation, AggregationStats};
use crate::io::event_log::RecordStream;
use crate::io::LogRecord;
use crate::strategy::AggregationStrategy;
use crate::types::{LedgerError, LogError};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::StreamExt;
use std::sync::Arc;

/// Configuration for batch processing
///
/// Controls how many records each task folds and how many tasks may run at
/// once. Also bounds the number of concurrent upserts during reconciliation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of records per batch
    pub batch_size: usize,
    /// Maximum number of batches in flight
    pub max_concurrent: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig with custom values
    ///
    /// Zero values fall back to the defaults with a warning.
    pub fn new(batch_size: usize, max_concurrent: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            tracing::warn!(
                batch_size,
                default = default.batch_size,
                "Invalid batch_size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent = if max_concurrent == 0 {
            tracing::warn!(
                max_concurrent,
                default = default.max_concurrent,
                "Invalid max_concurrent, using default"
            );
            default.max_concurrent
        } else {
            max_concurrent
        };

        Self {
            batch_size,
            max_concurrent,
        }
    }
}

/// Parallel batch aggregation strategy
#[derive(Debug, Clone)]
pub struct ParallelAggregation {
    config: BatchConfig,
}

impl ParallelAggregation {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }
}

struct BatchOutcome {
    stats: AggregationStats,
    end_offset: Option<u64>,
}

fn fold_batch(
    batch: Vec<Result<LogRecord, LogError>>,
    totals: &DashMap<String, i128>,
) -> Result<BatchOutcome, LogError> {
    let mut stats = AggregationStats::default();
    let mut end_offset = None;

    for item in batch {
        let record = item?;
        end_offset = Some(end_offset.map_or(record.end_offset, |end: u64| end.max(record.end_offset)));
        if let Some((key, delta)) = classify(&record, &mut stats) {
            *totals.entry(key).or_insert(0) += i128::from(delta);
        }
    }

    Ok(BatchOutcome { stats, end_offset })
}

#[async_trait]
impl AggregationStrategy for ParallelAggregation {
    async fn aggregate(
        &self,
        records: RecordStream,
        start_offset: u64,
    ) -> Result<Aggregation, LedgerError> {
        let totals: Arc<DashMap<String, i128>> = Arc::new(DashMap::new());

        let outcomes: Vec<_> = records
            .chunks(self.config.batch_size)
            .map(|batch| {
                let totals = Arc::clone(&totals);
                tokio::spawn(async move { fold_batch(batch, &totals) })
            })
            .buffer_unordered(self.config.max_concurrent)
            .collect()
            .await;

        let mut stats = AggregationStats::default();
        let mut end_offset = start_offset;
        let mut batches = 0usize;
        for outcome in outcomes {
            let outcome = outcome??;
            stats.merge(&outcome.stats);
            if let Some(end) = outcome.end_offset {
                end_offset = end_offset.max(end);
            }
            batches += 1;
        }

        tracing::debug!(
            batches,
            total_lines = stats.total_lines,
            skipped_lines = stats.skipped_lines,
            "Parallel aggregation finished"
        );

        let merged: Vec<(String, i128)> = totals
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();

        Ok(finish_totals(merged, stats, start_offset, end_offset))
    }
}
