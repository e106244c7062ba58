//! Core traits for balance persistence
//!
//! The reconciler and the balance query endpoint only talk to a
//! [`BalanceStore`], so the PostgreSQL store and the in-memory store can be
//! used interchangeably.

use crate::types::{Balance, BatchId, PersistenceError, UpsertOutcome};
use async_trait::async_trait;

/// Trait for persisting per-user revenue balances
///
/// `user_id` arguments are already normalized (see
/// [`crate::types::normalize_user_id`]).
#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Atomically add `delta` to the user's balance, creating the row if
    /// needed
    ///
    /// The `(batch, user_id)` pair is claimed in the same atomic step; if it
    /// was already claimed nothing changes and
    /// [`UpsertOutcome::AlreadyApplied`] is returned. Must never be
    /// implemented as a separate read followed by a write.
    async fn apply_delta(
        &self,
        batch: &BatchId,
        user_id: &str,
        delta: i64,
    ) -> Result<UpsertOutcome, PersistenceError>;

    /// Read one user's balance without modifying anything
    async fn get_balance(&self, user_id: &str) -> Result<Option<Balance>, PersistenceError>;
}
