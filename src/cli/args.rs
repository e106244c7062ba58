use crate::config::{
    default_checkpoint_path, LogConfig, ProcessConfig, ReplayConfig, ServerConfig, StoreConfig,
};
use crate::strategy::BatchConfig;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Ingest revenue events and reconcile per-user balances
#[derive(Parser, Debug)]
#[command(name = "revenue-ledger")]
#[command(about = "Ingest revenue events and reconcile per-user balances", long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the ingestion and balance query HTTP server
    Serve(ServeArgs),

    /// Aggregate new log lines and reconcile them into the balance store
    Process(ProcessArgs),

    /// Resend every line of a JSONL file to a running server
    Replay(ReplayArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long = "bind", env = "LEDGER_BIND", default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// Event log file, created if missing
    #[arg(long = "log-file", env = "LEDGER_LOG_FILE", default_value = "event_log.jsonl")]
    pub log_file: PathBuf,

    /// Balance store connection string
    #[arg(long = "database-url", env = "DATABASE_URL")]
    pub database_url: String,

    /// Shared secret expected in the Authorization header
    #[arg(long = "secret", env = "LEDGER_SECRET", hide_env_values = true)]
    pub secret: String,

    /// fsync the log after every append
    #[arg(long = "sync-on-append", env = "LEDGER_SYNC_ON_APPEND")]
    pub sync_on_append: bool,

    /// Database pool size
    #[arg(long = "max-connections", env = "LEDGER_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,
}

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Event log file to aggregate
    #[arg(long = "log-file", env = "LEDGER_LOG_FILE", default_value = "event_log.jsonl")]
    pub log_file: PathBuf,

    /// Balance store connection string
    #[arg(long = "database-url", env = "DATABASE_URL")]
    pub database_url: String,

    /// Checkpoint file (default: <log-file>.checkpoint)
    #[arg(long = "checkpoint", env = "LEDGER_CHECKPOINT")]
    pub checkpoint: Option<PathBuf>,

    /// Aggregation strategy to use
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "parallel",
        help = "Aggregation strategy: 'sequential' for a single pass or 'parallel' for batched tasks"
    )]
    pub strategy: StrategyType,

    /// Number of log lines per batch (parallel mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of log lines per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Maximum number of concurrent batches and upserts
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum number of batches or upserts in flight (default: CPU cores)"
    )]
    pub max_concurrent: Option<usize>,

    /// Database pool size
    #[arg(long = "max-connections", env = "LEDGER_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// JSONL file with one event payload per line
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Ingestion endpoint
    #[arg(
        long = "url",
        env = "LEDGER_REPLAY_URL",
        default_value = "http://127.0.0.1:8000/liveEvent"
    )]
    pub url: String,

    /// Shared secret sent in the Authorization header
    #[arg(long = "secret", env = "LEDGER_SECRET", hide_env_values = true)]
    pub secret: String,
}

/// Available aggregation strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sequential,
    Parallel,
}

impl ServeArgs {
    pub fn to_server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind,
            shared_secret: self.secret.clone(),
            log: LogConfig {
                path: self.log_file.clone(),
                sync_on_append: self.sync_on_append,
            },
            store: StoreConfig {
                database_url: self.database_url.clone(),
                max_connections: self.max_connections,
            },
        }
    }
}

impl ProcessArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Values not given on the command line fall back to the defaults.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent.unwrap_or(default.max_concurrent),
            )
        } else {
            BatchConfig::default()
        }
    }

    pub fn to_process_config(&self) -> ProcessConfig {
        ProcessConfig {
            log_path: self.log_file.clone(),
            checkpoint_path: self
                .checkpoint
                .clone()
                .unwrap_or_else(|| default_checkpoint_path(&self.log_file)),
            store: StoreConfig {
                database_url: self.database_url.clone(),
                max_connections: self.max_connections,
            },
            strategy: self.strategy,
            batch: self.to_batch_config(),
        }
    }
}

impl ReplayArgs {
    pub fn to_replay_config(&self) -> ReplayConfig {
        ReplayConfig {
            input: self.input.clone(),
            url: self.url.clone(),
            shared_secret: self.secret.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const DB: &str = "postgres://localhost/ledger";

    fn process_args(extra: &[&str]) -> ProcessArgs {
        let mut args = vec!["program", "process", "--database-url", DB];
        args.extend_from_slice(extra);
        match CliArgs::try_parse_from(args).unwrap().command {
            Command::Process(process) => process,
            other => panic!("Expected process command, got {other:?}"),
        }
    }

    // Strategy parsing tests
    #[rstest]
    #[case::default_strategy(&[], StrategyType::Parallel)]
    #[case::explicit_sequential(&["--strategy", "sequential"], StrategyType::Sequential)]
    #[case::explicit_parallel(&["--strategy", "parallel"], StrategyType::Parallel)]
    fn test_strategy_parsing(#[case] extra: &[&str], #[case] expected: StrategyType) {
        assert_eq!(process_args(extra).strategy, expected);
    }

    // Individual config option tests
    #[rstest]
    #[case::batch_size(&["--batch-size", "2000"], Some(2000), None)]
    #[case::max_concurrent(&["--max-concurrent", "8"], None, Some(8))]
    #[case::no_options(&[], None, None)]
    #[case::all_options(
        &["--strategy", "parallel", "--batch-size", "2000", "--max-concurrent", "8"],
        Some(2000),
        Some(8)
    )]
    fn test_config_options(
        #[case] extra: &[&str],
        #[case] batch_size: Option<usize>,
        #[case] max_concurrent: Option<usize>,
    ) {
        let parsed = process_args(extra);
        assert_eq!(parsed.batch_size, batch_size);
        assert_eq!(parsed.max_concurrent, max_concurrent);
    }

    // BatchConfig conversion tests with valid values
    #[rstest]
    #[case::all_defaults(&[], 1000, num_cpus::get())]
    #[case::custom_batch_size(&["--batch-size", "2000"], 2000, num_cpus::get())]
    #[case::custom_max_concurrent(&["--max-concurrent", "8"], 1000, 8)]
    #[case::zero_batch_size(&["--batch-size", "0"], 1000, num_cpus::get())]
    #[case::zero_max_concurrent(&["--max-concurrent", "0"], 1000, num_cpus::get())]
    fn test_batch_config_conversion(
        #[case] extra: &[&str],
        #[case] expected_batch_size: usize,
        #[case] expected_max_concurrent: usize,
    ) {
        let config = process_args(extra).to_batch_config();

        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.max_concurrent, expected_max_concurrent);
    }

    #[test]
    fn test_process_config_checkpoint_defaults_next_to_log() {
        let config = process_args(&["--log-file", "data/events.jsonl"]).to_process_config();
        assert_eq!(config.log_path, PathBuf::from("data/events.jsonl"));
        assert_eq!(
            config.checkpoint_path,
            PathBuf::from("data/events.jsonl.checkpoint")
        );
        assert_eq!(config.store.database_url, DB);

        let config = process_args(&["--checkpoint", "/var/lib/ledger/cp"]).to_process_config();
        assert_eq!(config.checkpoint_path, PathBuf::from("/var/lib/ledger/cp"));
    }

    #[test]
    fn test_serve_config() {
        let parsed = CliArgs::try_parse_from([
            "program",
            "serve",
            "--bind",
            "0.0.0.0:9000",
            "--database-url",
            DB,
            "--secret",
            "s3cret",
            "--sync-on-append",
        ])
        .unwrap();
        let Command::Serve(serve) = parsed.command else {
            panic!("Expected serve command");
        };

        let config = serve.to_server_config();
        assert_eq!(config.bind_addr, "0.0.0.0:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.shared_secret, "s3cret");
        assert!(config.log.sync_on_append);
        assert_eq!(config.store.database_url, DB);
    }

    #[test]
    fn test_replay_config() {
        let parsed = CliArgs::try_parse_from([
            "program",
            "replay",
            "captured.jsonl",
            "--url",
            "http://ledger:8000/liveEvent",
            "--secret",
            "s3cret",
        ])
        .unwrap();
        let Command::Replay(replay) = parsed.command else {
            panic!("Expected replay command");
        };

        assert_eq!(
            replay.to_replay_config(),
            ReplayConfig {
                input: PathBuf::from("captured.jsonl"),
                url: "http://ledger:8000/liveEvent".to_string(),
                shared_secret: "s3cret".to_string(),
            }
        );
    }

    // Error handling tests
    #[rstest]
    #[case::missing_command(&["program"])]
    #[case::invalid_strategy(&["program", "process", "--database-url", DB, "--strategy", "invalid"])]
    #[case::invalid_bind(&["program", "serve", "--bind", "nowhere", "--database-url", DB, "--secret", "s"])]
    #[case::replay_missing_input(&["program", "replay", "--secret", "s"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        assert!(CliArgs::try_parse_from(args).is_err());
    }
}
