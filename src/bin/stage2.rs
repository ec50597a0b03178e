//! Stage 2 CLI: sort and replay a day's grouped logs into enriched,
//! order-book-annotated per-ticker CSVs.

use std::process::ExitCode;

use clap::Parser;

use itch_replay::cli::Stage2Cli;
use itch_replay::config::resolve_data_root;
use itch_replay::error::ReplayMode;
use itch_replay::partition::ShardAssignment;
use itch_replay::reconstructor::{assigned_tickers_for_shard, NasdaqGroupedCsv, OrderBookReconstructor};

fn main() -> ExitCode {
    let cli = Stage2Cli::parse();
    init_tracing(cli.verbose);

    let data_root = resolve_data_root(cli.data_root.clone());
    let shard = ShardAssignment::new(cli.shard_count, cli.shard_rank);
    let mode: ReplayMode = cli.mode.into();

    tracing::info!(
        date = %cli.date,
        shard_rank = cli.shard_rank,
        shard_count = cli.shard_count,
        mode = ?mode,
        "stage 2 starting"
    );

    let tickers = match assigned_tickers_for_shard(&data_root, &cli.date, &shard) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(error = %e, "failed to list grouped files for this date");
            return ExitCode::FAILURE;
        }
    };

    let reconstructor = OrderBookReconstructor::new(mode);
    let mut failures = 0u32;
    for ticker in &tickers {
        let path = data_root.grouped_file(&cli.date, ticker);
        let source = NasdaqGroupedCsv { path: &path };
        match reconstructor.reconstruct_ticker(&source, &data_root, &cli.date, ticker) {
            Ok(rows) => tracing::info!(ticker = %ticker, rows, "ticker reconstructed"),
            Err(e) => {
                tracing::error!(ticker = %ticker, error = %e, "ticker reconstruction failed");
                failures += 1;
            }
        }
    }

    tracing::info!(
        date = %cli.date,
        shard_rank = cli.shard_rank,
        tickers = tickers.len(),
        failures,
        "stage 2 finished"
    );
    if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
