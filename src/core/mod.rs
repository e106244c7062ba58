//! Core business logic module
//!
//! This module contains the event pipeline components:
//! - `validator` - Strict decode and validation of one event payload
//! - `ingest` - Validate-then-append ingestion boundary
//! - `aggregator` - Line classification and per-user delta accumulation
//! - `reconciler` - Additive upsert of a delta map into the balance store
//! - `checkpoint` - Durable committed offset and pending range
//! - `engine` - Batch run orchestration (checkpoint, aggregate, reconcile)
//! - `traits` - Trait abstractions for interchangeable balance stores

pub mod aggregator;
pub mod checkpoint;
pub mod engine;
pub mod ingest;
pub mod reconciler;
pub mod traits;
pub mod validator;

pub use aggregator::{Aggregation, AggregationStats, DeltaAccumulator};
pub use checkpoint::{Checkpoint, LogRange};
pub use engine::{ReconciliationEngine, RunSummary};
pub use ingest::{IngestOutcome, IngestionService};
pub use reconciler::{ReconcileReport, ReconcileStatus, Reconciler, UserOutcome};
pub use traits::BalanceStore;
pub use validator::validate;
