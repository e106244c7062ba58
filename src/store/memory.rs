//! In-memory balance store
//!
//! Backed by `DashMap`, which locks per shard. The claim check and the
//! addition for a user both happen while that user's entry is held, which
//! gives the same per-user atomicity as the database upsert.

use crate::core::traits::BalanceStore;
use crate::types::{Balance, BatchId, PersistenceError, UpsertOutcome};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;

#[derive(Debug, Default)]
struct BalanceRow {
    revenue: i64,
    applied_batches: HashSet<String>,
}

/// Thread-safe in-memory balance store
#[derive(Debug, Default)]
pub struct MemoryBalanceStore {
    rows: DashMap<String, BalanceRow>,
}

impl MemoryBalanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with a balance row
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All balances, sorted by user id
    pub fn balances(&self) -> Vec<Balance> {
        let mut balances: Vec<Balance> = self
            .rows
            .iter()
            .map(|entry| Balance::new(entry.key().clone(), entry.value().revenue))
            .collect();
        balances.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        balances
    }
}

#[async_trait]
impl BalanceStore for MemoryBalanceStore {
    async fn apply_delta(
        &self,
        batch: &BatchId,
        user_id: &str,
        delta: i64,
    ) -> Result<UpsertOutcome, PersistenceError> {
        let mut row = self.rows.entry(user_id.to_string()).or_default();

        if row.applied_batches.contains(batch.as_str()) {
            return Ok(UpsertOutcome::AlreadyApplied);
        }

        let revenue = row
            .revenue
            .checked_add(delta)
            .ok_or_else(|| PersistenceError::Database {
                message: format!("bigint out of range for user {user_id}"),
            })?;

        row.revenue = revenue;
        row.applied_batches.insert(batch.as_str().to_string());

        Ok(UpsertOutcome::Applied { revenue })
    }

    async fn get_balance(&self, user_id: &str) -> Result<Option<Balance>, PersistenceError> {
        Ok(self
            .rows
            .get(user_id)
            .map(|row| Balance::new(user_id, row.revenue)))
    }
}
