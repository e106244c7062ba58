//! Revenue Ledger CLI
//!
//! Ingests revenue events over HTTP into an append-only JSONL log and
//! reconciles per-user balances from that log into `PostgreSQL`.
//!
//! # Usage
//!
//! ```bash
//! revenue-ledger serve --database-url postgres://localhost/ledger --secret secret
//! revenue-ledger process --database-url postgres://localhost/ledger > report.csv
//! revenue-ledger process --strategy sequential --log-file event_log.jsonl > report.csv
//! revenue-ledger process --strategy parallel --batch-size 2000 --max-concurrent 8 > report.csv
//! revenue-ledger replay events.jsonl --url http://localhost:8000/liveEvent --secret secret
//! ```
//!
//! `process` writes the per-user reconciliation report as CSV to stdout;
//! diagnostics go to stderr through `tracing` (filter with `RUST_LOG`).
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (bad configuration, unreadable log or checkpoint, database
//!   unreachable, or a reconciliation run that left users pending)

use revenue_ledger::cli::{self, Command, ProcessArgs, ReplayArgs, ServeArgs};
use revenue_ledger::config::ProcessConfig;
use revenue_ledger::core::{IngestionService, ReconciliationEngine, Reconciler};
use revenue_ledger::http::{self, AppState};
use revenue_ledger::io::{write_report_csv, EventLog};
use revenue_ledger::replay::ReplayClient;
use revenue_ledger::store::PostgresBalanceStore;
use revenue_ledger::strategy;
use revenue_ledger::types::LedgerError;
use std::process;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,revenue_ledger=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = cli::parse_args();

    let result = match args.command {
        Command::Serve(serve) => run_serve(&serve).await,
        Command::Process(process) => run_process(&process).await,
        Command::Replay(replay) => run_replay(&replay).await,
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Command failed");
        process::exit(1);
    }
}

async fn run_serve(args: &ServeArgs) -> Result<(), LedgerError> {
    let config = args.to_server_config();
    tracing::info!(
        bind = %config.bind_addr,
        log_file = %config.log.path.display(),
        sync_on_append = config.log.sync_on_append,
        "Configuration loaded"
    );

    let log = Arc::new(EventLog::open(&config.log).await?);
    let store = PostgresBalanceStore::connect(&config.store).await?;
    let state = AppState::new(
        IngestionService::new(log),
        Arc::new(store),
        config.shared_secret.as_str(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .map_err(|e| LedgerError::Server {
            message: format!("cannot bind {}: {e}", config.bind_addr),
        })?;

    http::serve(listener, state).await
}

async fn run_process(args: &ProcessArgs) -> Result<(), LedgerError> {
    let config: ProcessConfig = args.to_process_config();
    tracing::info!(
        log_file = %config.log_path.display(),
        checkpoint = %config.checkpoint_path.display(),
        strategy = ?config.strategy,
        batch_size = config.batch.batch_size,
        max_concurrent = config.batch.max_concurrent,
        "Configuration loaded"
    );

    let store = Arc::new(PostgresBalanceStore::connect(&config.store).await?);
    let engine = ReconciliationEngine::new(
        strategy::create_strategy(config.strategy, Some(config.batch.clone())),
        Reconciler::new(store, config.batch.max_concurrent),
        config.log_path.clone(),
        config.checkpoint_path.clone(),
    );

    let summary = engine.run().await?;

    let mut output = std::io::stdout();
    write_report_csv(&summary, &mut output)?;

    tracing::info!(
        start = summary.range.start,
        end = summary.range.end,
        retried = summary.retried,
        lines = summary.stats.total_lines,
        skipped = summary.stats.skipped_lines,
        overflowed_users = summary.stats.overflowed_users,
        applied = summary.report.applied(),
        already_applied = summary.report.already_applied(),
        failed = summary.report.failed(),
        committed_offset = summary.checkpoint.committed_offset,
        "Run finished"
    );

    summary.report.into_result()?;
    Ok(())
}

async fn run_replay(args: &ReplayArgs) -> Result<(), LedgerError> {
    let config = args.to_replay_config();
    let client = ReplayClient::new(&config)?;
    let summary = client.replay_file(&config.input).await?;

    if summary.failed > 0 {
        return Err(LedgerError::Http {
            message: format!("{} of {} events were not saved", summary.failed, summary.sent),
        });
    }
    Ok(())
}
