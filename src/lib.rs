//! Revenue Ledger Library
//! # Overview
//!
//! This library ingests revenue events into a durable newline-delimited JSON
//! log and reconciles per-user revenue balances from that log, with a
//! sequential and a parallel aggregation strategy.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Event, Balance, errors)
//! - [`cli`] - CLI arguments parsing
//! - [`config`] - Per-command configuration built from the CLI
//! - [`core`] - Business logic components:
//!   - [`core::validator`] - Strict decode and validation of one payload
//!   - [`core::ingest`] - Validate-then-append ingestion boundary
//!   - [`core::aggregator`] - Per-user net deltas over a log range
//!   - [`core::reconciler`] - Additive upsert of deltas into the balance store
//!   - [`core::engine`] - Checkpointed batch runs
//! - [`io`] - Event log framing, reads and appends; CSV report output
//! - [`strategy`] - Pluggable aggregation strategies
//! - [`store`] - `PostgreSQL` and in-memory balance stores
//! - [`http`] - Ingestion and balance query endpoints
//! - [`replay`] - Client that resends captured lines to a running server
//!
//! # Event Types
//!
//! - **add_revenue**: Adds `value` to the user's balance
//! - **subtract_revenue**: Subtracts `value` from the user's balance
//!
//! # Balances
//!
//! Each user has one signed 64-bit balance that only ever changes by an
//! additive upsert. Balances may go negative. User ids are compared
//! case-insensitively.

// Module declarations
pub mod cli;
pub mod config;
pub mod core;
pub mod http;
pub mod io;
pub mod replay;
pub mod store;
pub mod strategy;
pub mod types;

pub use core::{BalanceStore, IngestOutcome, IngestionService, ReconciliationEngine, Reconciler};
pub use io::{write_report_csv, EventLog};
pub use store::{MemoryBalanceStore, PostgresBalanceStore};
pub use types::{
    Balance, BatchId, DeltaMap, Event, EventName, LedgerError, LogError, PersistenceError,
    RejectionReason,
};
