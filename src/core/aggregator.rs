//! Log aggregation
//!
//! Reduces a run of log records to one net delta per user. Every record is
//! validated again here: a line that made it into the log is not trusted to
//! be valid, since other writers or older formats may have put it there.
//! An invalid line is counted and skipped; it never aborts the pass.
//!
//! # Order independence
//!
//! Totals are kept as `i128` and only narrowed to `i64` once the pass is
//! complete, so the final map depends only on the multiset of records and
//! not on the order they were folded in. Partial accumulators built on
//! different workers can be merged in any order.

use crate::core::validator::validate;
use crate::io::LogRecord;
use crate::types::{DeltaMap, RejectionReason};
use std::collections::HashMap;

/// Counters for one aggregation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationStats {
    /// Every line read, blank lines included
    pub total_lines: u64,

    /// Whitespace-only lines; not counted as skipped
    pub blank_lines: u64,

    /// Lines that failed validation
    pub skipped_lines: u64,

    pub malformed: u64,
    pub missing_user_id: u64,
    pub invalid_name: u64,
    pub negative_value: u64,

    /// Users whose net delta did not fit in an `i64`; see [`Aggregation::overflowed`]
    pub overflowed_users: u64,
}

impl AggregationStats {
    /// Lines that contributed a delta
    pub fn applied_lines(&self) -> u64 {
        self.total_lines - self.blank_lines - self.skipped_lines
    }

    pub fn merge(&mut self, other: &AggregationStats) {
        self.total_lines += other.total_lines;
        self.blank_lines += other.blank_lines;
        self.skipped_lines += other.skipped_lines;
        self.malformed += other.malformed;
        self.missing_user_id += other.missing_user_id;
        self.invalid_name += other.invalid_name;
        self.negative_value += other.negative_value;
        self.overflowed_users += other.overflowed_users;
    }

    fn record_rejection(&mut self, reason: &RejectionReason) {
        self.skipped_lines += 1;
        match reason {
            RejectionReason::MalformedPayload { .. } => self.malformed += 1,
            RejectionReason::MissingUserId => self.missing_user_id += 1,
            RejectionReason::InvalidName { .. } => self.invalid_name += 1,
            RejectionReason::NegativeValue { .. } => self.negative_value += 1,
        }
    }
}

/// Output of one aggregation pass over a byte range of the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub deltas: DeltaMap,
    pub stats: AggregationStats,

    /// Users left out of `deltas` because their net total does not fit in an
    /// `i64`, sorted by user id. Their events cannot be applied as is, so a
    /// run over this range must not be committed.
    pub overflowed: Vec<(String, i128)>,

    /// Offset the pass started at
    pub start_offset: u64,

    /// Offset just past the last complete record read
    pub end_offset: u64,
}

/// Running per-user totals
///
/// Fold records with [`DeltaAccumulator::fold_record`], combine partial
/// accumulators with [`DeltaAccumulator::merge`], then call
/// [`DeltaAccumulator::finish`].
#[derive(Debug, Clone, Default)]
pub struct DeltaAccumulator {
    totals: HashMap<String, i128>,
    stats: AggregationStats,
    end_offset: Option<u64>,
}

impl DeltaAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate one record and add its delta
    pub fn fold_record(&mut self, record: &LogRecord) {
        self.note_end(record.end_offset);
        if let Some((key, delta)) = classify(record, &mut self.stats) {
            *self.totals.entry(key).or_insert(0) += i128::from(delta);
        }
    }

    pub fn merge(&mut self, other: DeltaAccumulator) {
        for (key, total) in other.totals {
            *self.totals.entry(key).or_insert(0) += total;
        }
        self.stats.merge(&other.stats);
        if let Some(end) = other.end_offset {
            self.note_end(end);
        }
    }

    pub fn stats(&self) -> &AggregationStats {
        &self.stats
    }

    /// Narrow the totals and produce the pass result
    pub fn finish(self, start_offset: u64) -> Aggregation {
        finish_totals(
            self.totals,
            self.stats,
            start_offset,
            self.end_offset.unwrap_or(start_offset),
        )
    }

    fn note_end(&mut self, end: u64) {
        self.end_offset = Some(self.end_offset.map_or(end, |current| current.max(end)));
    }
}

/// Count one record and return its normalized key and delta if it is valid
///
/// Shared by every aggregation strategy so they classify lines identically.
pub fn classify(record: &LogRecord, stats: &mut AggregationStats) -> Option<(String, i64)> {
    stats.total_lines += 1;

    if record.is_blank() {
        stats.blank_lines += 1;
        return None;
    }

    match validate(&record.raw) {
        Ok(event) => Some((event.user_key(), event.delta())),
        Err(reason) => {
            tracing::warn!(
                line = record.line_number,
                offset = record.start_offset,
                %reason,
                content = %record.text(),
                "Skipped log line"
            );
            stats.record_rejection(&reason);
            None
        }
    }
}

/// Narrow `i128` totals into a [`DeltaMap`]
pub fn finish_totals(
    totals: impl IntoIterator<Item = (String, i128)>,
    mut stats: AggregationStats,
    start_offset: u64,
    end_offset: u64,
) -> Aggregation {
    let mut deltas = DeltaMap::new();
    let mut overflowed = Vec::new();
    for (key, total) in totals {
        match i64::try_from(total) {
            Ok(delta) => {
                deltas.insert(key, delta);
            }
            Err(_) => {
                tracing::warn!(user_id = %key, total = %total, "Net delta out of range, user left out");
                stats.overflowed_users += 1;
                overflowed.push((key, total));
            }
        }
    }
    overflowed.sort();

    Aggregation {
        deltas,
        stats,
        overflowed,
        start_offset,
        end_offset,
    }
}
