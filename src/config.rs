//! Runtime configuration
//!
//! Built once from the command line (see [`crate::cli`]) and handed by
//! reference to each component constructor. Nothing in the library reads
//! environment variables or global state on its own.

use crate::cli::StrategyType;
use crate::strategy::BatchConfig;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Event log location and durability
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub path: PathBuf,

    /// fsync after every append
    pub sync_on_append: bool,
}

/// Balance store connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub database_url: String,
    pub max_connections: u32,
}

/// `serve` command: ingestion and balance query endpoints
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,

    /// Expected value of the `Authorization` header on ingestion
    pub shared_secret: String,

    pub log: LogConfig,
    pub store: StoreConfig,
}

/// `process` command: one aggregation and reconciliation run
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    pub log_path: PathBuf,
    pub checkpoint_path: PathBuf,
    pub store: StoreConfig,
    pub strategy: StrategyType,
    pub batch: BatchConfig,
}

/// `replay` command: resend captured lines to a running server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayConfig {
    pub input: PathBuf,

    /// Full URL of the ingestion endpoint
    pub url: String,

    pub shared_secret: String,
}

/// Checkpoint path used when none is given: `<log file>.checkpoint`
pub fn default_checkpoint_path(log_path: &std::path::Path) -> PathBuf {
    let mut name = log_path.as_os_str().to_owned();
    name.push(".checkpoint");
    PathBuf::from(name)
}
