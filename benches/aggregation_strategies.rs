//! Benchmark suite for comparing aggregation strategies
//!
//! This benchmark compares the sequential and parallel aggregation
//! strategies, and the reconciler on top of the in-memory store, using the
//! divan benchmarking framework.
//!
//! # Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench
//! ```
//!
//! # Generated Logs
//!
//! Logs are generated into a temp file before timing starts, at three sizes
//! (1,000 / 100,000 / 1,000,000 lines). Each log mixes:
//! - add_revenue and subtract_revenue events
//! - 500 distinct users with mixed-case ids
//! - Roughly 1% invalid lines (negative values, unknown names)

use revenue_ledger::cli::StrategyType;
use revenue_ledger::core::Reconciler;
use revenue_ledger::store::MemoryBalanceStore;
use revenue_ledger::strategy::{aggregate_range, create_strategy, BatchConfig};
use revenue_ledger::types::BatchId;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::runtime::Runtime;
use uuid::Uuid;

const SIZES: [usize; 3] = [1_000, 100_000, 1_000_000];

fn main() {
    divan::main();
}

fn generate_log(lines: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    {
        let mut writer = std::io::BufWriter::new(file.as_file_mut());
        for i in 0..lines {
            let user = if i % 2 == 0 {
                format!("user-{}", i % 500)
            } else {
                format!("USER-{}", i % 500)
            };
            let line = match i % 100 {
                0 => format!(r#"{{"userId":"{user}","name":"add_revenue","value":-1}}"#),
                50 => format!(r#"{{"userId":"{user}","name":"refund","value":1}}"#),
                n if n % 3 == 0 => {
                    format!(r#"{{"userId":"{user}","name":"subtract_revenue","value":{n}}}"#)
                }
                n => format!(r#"{{"userId":"{user}","name":"add_revenue","value":{n}}}"#),
            };
            writeln!(writer, "{line}").expect("Failed to write log line");
        }
        writer.flush().expect("Failed to flush log");
    }
    file
}

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime")
}

fn bench_strategy(bencher: divan::Bencher, lines: usize, strategy_type: StrategyType) {
    let log = generate_log(lines);
    let rt = runtime();
    let strategy = create_strategy(strategy_type, Some(BatchConfig::default()));

    bencher.bench_local(|| {
        rt.block_on(aggregate_range(strategy.as_ref(), log.path(), 0, None))
            .expect("Aggregation failed")
    });
}

/// Benchmark the sequential strategy
#[divan::bench(args = SIZES)]
fn sequential_strategy(bencher: divan::Bencher, lines: usize) {
    bench_strategy(bencher, lines, StrategyType::Sequential);
}

/// Benchmark the parallel strategy with default batch configuration
#[divan::bench(args = SIZES)]
fn parallel_strategy(bencher: divan::Bencher, lines: usize) {
    bench_strategy(bencher, lines, StrategyType::Parallel);
}

/// Benchmark reconciling one aggregated delta map into a fresh in-memory store
#[divan::bench(args = SIZES)]
fn reconcile_memory_store(bencher: divan::Bencher, lines: usize) {
    let log = generate_log(lines);
    let rt = runtime();
    let strategy = create_strategy(StrategyType::Parallel, None);
    let aggregation = rt
        .block_on(aggregate_range(strategy.as_ref(), log.path(), 0, None))
        .expect("Aggregation failed");
    let batch = BatchId::new(Uuid::nil(), aggregation.start_offset, aggregation.end_offset);

    bencher.bench_local(|| {
        let reconciler = Reconciler::new(Arc::new(MemoryBalanceStore::new()), num_cpus::get());
        rt.block_on(reconciler.reconcile(&batch, &aggregation.deltas))
    });
}
