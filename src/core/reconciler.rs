//! Balance reconciliation
//!
//! Applies an aggregated delta map to the balance store, one independent
//! additive upsert per user. There is no transaction spanning users: a
//! failure for one user is recorded in the report and the others proceed.
//! Upserts are issued concurrently, bounded by `max_concurrent`; since each
//! user's update is independent, completion order does not matter.

use crate::core::traits::BalanceStore;
use crate::types::{BatchId, DeltaMap, PersistenceError, ReconcileError, UpsertOutcome};
use futures::stream::{self, StreamExt};
use std::sync::Arc;

/// What happened to one user's delta
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileStatus {
    /// Added; carries the new balance
    Applied { revenue: i64 },

    /// This batch had already been applied to the user
    AlreadyApplied,

    /// The upsert failed; the balance is unchanged
    Failed(PersistenceError),
}

impl ReconcileStatus {
    /// Short label used in reports
    pub const fn label(&self) -> &'static str {
        match self {
            ReconcileStatus::Applied { .. } => "applied",
            ReconcileStatus::AlreadyApplied => "already_applied",
            ReconcileStatus::Failed(_) => "failed",
        }
    }
}

/// Outcome for one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserOutcome {
    pub user_id: String,

    /// Net delta over the range; wider than a balance so that an
    /// out-of-range total can still be reported
    pub delta: i128,

    pub status: ReconcileStatus,
}

/// Per-user outcomes of one reconciliation, sorted by user id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub outcomes: Vec<UserOutcome>,
}

impl ReconcileReport {
    pub fn applied(&self) -> usize {
        self.count(|status| matches!(status, ReconcileStatus::Applied { .. }))
    }

    pub fn already_applied(&self) -> usize {
        self.count(|status| matches!(status, ReconcileStatus::AlreadyApplied))
    }

    pub fn failed(&self) -> usize {
        self.count(|status| matches!(status, ReconcileStatus::Failed(_)))
    }

    /// True when no user failed
    pub fn is_complete(&self) -> bool {
        self.failed() == 0
    }

    /// Record users whose net delta could not be applied at all
    ///
    /// Each one is reported as failed with [`PersistenceError::DeltaOverflow`],
    /// which keeps the report incomplete.
    pub fn record_overflow(&mut self, overflowed: &[(String, i128)]) {
        if overflowed.is_empty() {
            return;
        }
        self.outcomes
            .extend(overflowed.iter().map(|(user_id, total)| UserOutcome {
                user_id: user_id.clone(),
                delta: *total,
                status: ReconcileStatus::Failed(PersistenceError::DeltaOverflow { total: *total }),
            }));
        self.outcomes.sort_by(|a, b| a.user_id.cmp(&b.user_id));
    }

    /// Collapse to `Ok(())` or the list of failed users
    pub fn into_result(self) -> Result<(), ReconcileError> {
        let failed: Vec<(String, PersistenceError)> = self
            .outcomes
            .into_iter()
            .filter_map(|outcome| match outcome.status {
                ReconcileStatus::Failed(error) => Some((outcome.user_id, error)),
                _ => None,
            })
            .collect();

        if failed.is_empty() {
            Ok(())
        } else {
            Err(ReconcileError { failed })
        }
    }

    fn count(&self, predicate: impl Fn(&ReconcileStatus) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| predicate(&outcome.status))
            .count()
    }
}

/// Applies delta maps to a [`BalanceStore`]
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn BalanceStore>,
    max_concurrent: usize,
}

impl Reconciler {
    pub fn new(store: Arc<dyn BalanceStore>, max_concurrent: usize) -> Self {
        Self {
            store,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Apply every delta in `deltas` under `batch`
    pub async fn reconcile(&self, batch: &BatchId, deltas: &DeltaMap) -> ReconcileReport {
        let mut outcomes: Vec<UserOutcome> = stream::iter(deltas.iter())
            .map(|(user_id, &delta)| async move {
                let status = match self.store.apply_delta(batch, user_id, delta).await {
                    Ok(UpsertOutcome::Applied { revenue }) => {
                        tracing::debug!(user_id = %user_id, delta, revenue, "Balance updated");
                        ReconcileStatus::Applied { revenue }
                    }
                    Ok(UpsertOutcome::AlreadyApplied) => {
                        tracing::info!(user_id = %user_id, %batch, "Batch already applied, skipping");
                        ReconcileStatus::AlreadyApplied
                    }
                    Err(error) => {
                        tracing::error!(user_id = %user_id, delta, %error, "Balance update failed");
                        ReconcileStatus::Failed(error)
                    }
                };
                UserOutcome {
                    user_id: user_id.clone(),
                    delta: i128::from(delta),
                    status,
                }
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        outcomes.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        ReconcileReport { outcomes }
    }
}
