//! Aggregation strategy module
//!
//! This module defines the Strategy pattern for aggregation passes over the
//! event log. Both strategies classify lines through the same validator and
//! must produce identical delta maps for the same records; they differ only
//! in how the work is scheduled.

use crate::cli::StrategyType;
use crate::core::aggregator::Aggregation;
use crate::io::event_log::{read_range, RecordStream};
use crate::types::LedgerError;
use async_trait::async_trait;
use std::path::Path;

pub mod parallel;
pub mod sequential;

pub use parallel::{BatchConfig, ParallelAggregation};
pub use sequential::SequentialAggregation;

/// Aggregation strategy trait
///
/// Implementations consume a stream of log records and reduce it to one net
/// delta per user. Invalid lines are counted in the stats, never returned as
/// errors; an `Err` means the records themselves could not be read.
#[async_trait]
pub trait AggregationStrategy: Send + Sync {
    /// Aggregate `records`, which start at byte `start_offset` of the log
    async fn aggregate(
        &self,
        records: RecordStream,
        start_offset: u64,
    ) -> Result<Aggregation, LedgerError>;
}

/// Create an aggregation strategy based on the specified strategy type
///
/// `config` is only used by the parallel strategy; `None` means defaults.
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
) -> Box<dyn AggregationStrategy> {
    match strategy_type {
        StrategyType::Sequential => Box::new(SequentialAggregation),
        StrategyType::Parallel => {
            let config = config.unwrap_or_default();
            Box::new(ParallelAggregation::new(config))
        }
    }
}

/// Aggregate the complete records in `[start, end)` of the log at `path`
///
/// With `end` unset the pass runs to the last complete line.
pub async fn aggregate_range(
    strategy: &dyn AggregationStrategy,
    path: &Path,
    start: u64,
    end: Option<u64>,
) -> Result<Aggregation, LedgerError> {
    let records = read_range(path, start, end).await?;
    strategy.aggregate(records, start).await
}
