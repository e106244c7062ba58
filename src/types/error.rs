//! Error types for the revenue ledger
//!
//! This module defines all error types that can occur while ingesting,
//! aggregating and reconciling revenue events.
//!
//! # Error Categories
//!
//! - **Validation**: the payload is rejected before anything is written
//! - **Event log**: append or read failures on the newline-delimited log
//! - **Persistence**: balance store unavailable or an upsert failed
//! - **Auth**: missing or wrong shared secret at the HTTP boundary
//! - **Ledger**: run-level failures (checkpoint, incomplete reconciliation, task, HTTP)

use thiserror::Error;

/// Why an event payload was not accepted
///
/// Rules are checked in declaration order and the first failure wins. These
/// are client-caused and never retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectionReason {
    /// The payload does not decode into `userId`, `name` and an integer `value`
    #[error("Malformed payload: {message}")]
    MalformedPayload {
        /// Decoder message
        message: String,
    },

    /// `userId` is empty or only whitespace
    #[error("Missing or empty 'userId'.")]
    MissingUserId,

    /// `name` is not one of the recognized variants
    #[error("Invalid 'name': {name}. Must be 'add_revenue' or 'subtract_revenue'.")]
    InvalidName {
        /// The name as received
        name: String,
    },

    /// `value` is below zero
    #[error("'value' must be non-negative, got {value}.")]
    NegativeValue {
        /// The value as received
        value: i64,
    },
}

impl RejectionReason {
    /// Create a MalformedPayload rejection
    pub fn malformed(message: impl ToString) -> Self {
        RejectionReason::MalformedPayload {
            message: message.to_string(),
        }
    }

    /// Create an InvalidName rejection
    pub fn invalid_name(name: &str) -> Self {
        RejectionReason::InvalidName {
            name: name.to_string(),
        }
    }
}

/// Failure on the durable event log
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LogError {
    /// The log file does not exist
    #[error("Event log not found: {path}")]
    NotFound {
        /// Path that was not found
        path: String,
    },

    /// I/O error while appending or reading
    #[error("Event log I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// The record cannot be framed as a single log line
    #[error("Invalid log record: {message}")]
    InvalidRecord {
        /// Why the record was refused
        message: String,
    },
}

impl From<std::io::Error> for LogError {
    fn from(error: std::io::Error) -> Self {
        LogError::IoError {
            message: error.to_string(),
        }
    }
}

/// Failure on the balance store
///
/// Reported per user during reconciliation; one failure never aborts the
/// rest of the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    /// Database unavailable, constraint failure, numeric overflow, ...
    #[error("Database error: {message}")]
    Database {
        /// Driver message
        message: String,
    },

    /// The net delta for the user does not fit in a 64-bit balance
    #[error("Net delta {total} does not fit in a 64-bit balance")]
    DeltaOverflow {
        /// Net delta over the range
        total: i128,
    },

    /// Schema creation failed
    #[error("Schema error: {message}")]
    Schema {
        /// Driver message
        message: String,
    },
}

impl From<sqlx::Error> for PersistenceError {
    fn from(error: sqlx::Error) -> Self {
        PersistenceError::Database {
            message: error.to_string(),
        }
    }
}

/// Shared-secret check failure at the ingestion endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingCredential,

    #[error("Invalid Authorization credential")]
    InvalidCredential,
}

/// One or more users failed during reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Reconciliation failed for {} user(s)", failed.len())]
pub struct ReconcileError {
    /// Failed user ids with the store error each one hit
    pub failed: Vec<(String, PersistenceError)>,
}

/// Run-level error for the CLI commands
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Log(#[from] LogError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Some users were not reconciled; their range stays pending
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// Checkpoint unreadable, unwritable or inconsistent with the log
    #[error("Checkpoint error: {message}")]
    Checkpoint {
        /// Description of the checkpoint problem
        message: String,
    },

    /// A worker task panicked or was cancelled
    #[error("Task error: {message}")]
    Task {
        /// Join error description
        message: String,
    },

    /// Replay client failure
    #[error("HTTP error: {message}")]
    Http {
        /// Client error description
        message: String,
    },

    /// Report output failure
    #[error("Report error: {message}")]
    Report {
        /// Writer error description
        message: String,
    },

    /// Server bind or serve failure
    #[error("Server error: {message}")]
    Server {
        /// Description of the failure
        message: String,
    },
}

impl LedgerError {
    /// Create a Checkpoint error
    pub fn checkpoint(message: impl ToString) -> Self {
        LedgerError::Checkpoint {
            message: message.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for LedgerError {
    fn from(error: tokio::task::JoinError) -> Self {
        LedgerError::Task {
            message: error.to_string(),
        }
    }
}

impl From<reqwest::Error> for LedgerError {
    fn from(error: reqwest::Error) -> Self {
        LedgerError::Http {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        LedgerError::Report {
            message: error.to_string(),
        }
    }
}
