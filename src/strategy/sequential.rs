//! Sequential aggregation strategy
//!
//! Folds records one at a time, in append order, into a single
//! [`DeltaAccumulator`]. Memory use is O(distinct users), independent of
//! log size, since records are streamed rather than loaded.

use crate::core::aggregator::{Aggregation, DeltaAccumulator};
use crate::io::event_log::RecordStream;
use crate::strategy::AggregationStrategy;
use crate::types::LedgerError;
use async_trait::async_trait;
use futures::StreamExt;

/// Single-task aggregation strategy
#[derive(Debug, Clone, Copy)]
pub struct SequentialAggregation;

#[async_trait]
impl AggregationStrategy for SequentialAggregation {
    async fn aggregate(
        &self,
        mut records: RecordStream,
        start_offset: u64,
    ) -> Result<Aggregation, LedgerError> {
        let mut accumulator = DeltaAccumulator::new();

        while let Some(item) = records.next().await {
            accumulator.fold_record(&item?);
        }

        tracing::debug!(
            total_lines = accumulator.stats().total_lines,
            skipped_lines = accumulator.stats().skipped_lines,
            "Sequential aggregation finished"
        );

        Ok(accumulator.finish(start_offset))
    }
}
