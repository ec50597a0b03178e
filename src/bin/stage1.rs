//! Stage 1 CLI: decode one day's ITCH feed and group it into per-ticker logs.

use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;

use clap::Parser;
use flate2::read::GzDecoder;

use itch_replay::cli::Stage1Cli;
use itch_replay::config::resolve_data_root;
use itch_replay::grouper::StreamGrouper;
use itch_replay::message::next_message;
use itch_replay::partition::ShardAssignment;
use itch_replay::stream::ByteStream;

fn main() -> ExitCode {
    let cli = Stage1Cli::parse();
    init_tracing(cli.verbose);

    let data_root = resolve_data_root(cli.data_root.clone());
    let shard = ShardAssignment::new(cli.shard_count, cli.shard_rank);

    tracing::info!(
        date = %cli.date,
        shard_rank = cli.shard_rank,
        shard_count = cli.shard_count,
        "stage 1 starting"
    );

    let feed_path = data_root.binary_file(&cli.date);
    let file = match File::open(&feed_path) {
        Ok(f) => f,
        Err(e) => {
            tracing::error!(path = %feed_path.display(), error = %e, "failed to open feed file");
            return ExitCode::FAILURE;
        }
    };
    let mut stream = ByteStream::new(GzDecoder::new(BufReader::new(file)));
    let mut grouper = StreamGrouper::new(cli.date.clone(), shard, data_root, cli.cache_max);

    while grouper.keep_processing() {
        match next_message(&mut stream) {
            Ok(Some(msg)) => {
                if let Err(e) = grouper.dispatch(&msg) {
                    tracing::error!(error = %e, "fatal I/O error during dispatch, aborting shard");
                    return ExitCode::FAILURE;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "fatal decode error, aborting shard");
                return ExitCode::FAILURE;
            }
        }
    }

    if let Err(e) = grouper.finish() {
        tracing::error!(error = %e, "failed to flush final write caches");
        return ExitCode::FAILURE;
    }

    tracing::info!(
        date = %cli.date,
        shard_rank = cli.shard_rank,
        tickers = grouper.tickers().len(),
        "stage 1 finished"
    );
    ExitCode::SUCCESS
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
