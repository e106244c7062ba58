//! Balance-related types for the revenue ledger
//!
//! This module defines the persisted balance row, the per-pass delta map
//! produced by aggregation, and the batch identifier that tags each
//! reconciliation so it is applied at most once per user.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Net delta per normalized user id for one aggregation pass
pub type DeltaMap = HashMap<String, i64>;

/// Persisted revenue total for one user
///
/// Serializes as `{"userId": "...", "revenue": <int>}`. `revenue` may be
/// negative when debits exceed credits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub user_id: String,
    pub revenue: i64,
}

impl Balance {
    pub fn new(user_id: impl Into<String>, revenue: i64) -> Self {
        Self {
            user_id: user_id.into(),
            revenue,
        }
    }
}

/// Identifier of the log range a delta map was aggregated from
///
/// Formatted as `<log id>:<start>-<end>`. The log id is assigned once per
/// log and kept in its checkpoint, so equal byte ranges of two different
/// logs never share an id, while re-aggregating the same range of the same
/// log yields the same id and lets the store recognize a repeated upsert.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BatchId(String);

impl BatchId {
    pub fn new(log_id: Uuid, start: u64, end: u64) -> Self {
        BatchId(format!("{log_id}:{start}-{end}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of one additive upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The delta was added; carries the balance after the update
    Applied { revenue: i64 },

    /// This batch was already applied to this user; nothing changed
    AlreadyApplied,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_id_format() {
        assert_eq!(
            BatchId::new(Uuid::nil(), 0, 128).as_str(),
            "00000000-0000-0000-0000-000000000000:0-128"
        );
        assert_eq!(
            BatchId::new(Uuid::nil(), 10, 20).to_string(),
            "00000000-0000-0000-0000-000000000000:10-20"
        );
    }

    #[test]
    fn test_same_range_of_different_logs_differs() {
        let first = BatchId::new(Uuid::new_v4(), 0, 50);
        let second = BatchId::new(Uuid::new_v4(), 0, 50);
        assert_ne!(first, second);
    }

    #[test]
    fn test_balance_serializes_camel_case() {
        let json = serde_json::to_string(&Balance::new("bob", -5)).unwrap();
        assert_eq!(json, r#"{"userId":"bob","revenue":-5}"#);
    }
}
