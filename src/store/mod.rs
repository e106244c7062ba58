//! Balance store implementations
//!
//! - `postgres` - `PostgreSQL` store used by the `serve` and `process` commands
//! - `memory` - `DashMap` store with the same semantics, for tests and benches

pub mod memory;
pub mod postgres;

pub use memory::MemoryBalanceStore;
pub use postgres::PostgresBalanceStore;
