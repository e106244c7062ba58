//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `event`: revenue events and their deltas
//! - `balance`: persisted balances, delta maps and batch identifiers
//! - `error`: error types for the ledger

pub mod balance;
pub mod error;
pub mod event;

pub use balance::{Balance, BatchId, DeltaMap, UpsertOutcome};
pub use error::{
    AuthError, LedgerError, LogError, PersistenceError, ReconcileError, RejectionReason,
};
pub use event::{normalize_user_id, Event, EventName};
