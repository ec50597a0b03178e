//! Shared `clap` argument definitions for the `stage1`/`stage2` binaries,
//! kept in the library crate so `tests/` can exercise argument parsing
//! directly via `Cli::try_parse_from` without spawning a subprocess.

use std::path::PathBuf;

use clap::Parser;

use crate::error::ReplayMode;

/// Validates a `MMDDYY` feed date against the calendar, so a malformed or
/// out-of-range date is rejected at argument-parsing time rather than
/// surfacing later as a nonsensical data-root path.
fn parse_feed_date(raw: &str) -> Result<String, String> {
    chrono::NaiveDate::parse_from_str(raw, "%m%d%y")
        .map(|_| raw.to_string())
        .map_err(|e| format!("invalid feed date {raw:?} (expected MMDDYY): {e}"))
}

/// Decodes a day's ITCH 5.0 feed and groups events by order-reference number
/// into per-ticker grouped CSV logs.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "stage1", version, about)]
pub struct Stage1Cli {
    /// Feed date, `MMDDYY`.
    #[arg(value_parser = parse_feed_date)]
    pub date: String,
    /// Total number of shards this run is split across.
    pub shard_count: u32,
    /// This shard's rank, `0..shard_count`.
    pub shard_rank: u32,
    /// Overrides the configured data root for this invocation.
    #[arg(long, env = "ITCH_DATA_ROOT")]
    pub data_root: Option<PathBuf>,
    /// Per-ticker write-cache flush threshold, in rows.
    #[arg(long, default_value_t = 1000)]
    pub cache_max: usize,
    /// Increase log verbosity (`-v` debug, `-vv` trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ReplayModeArg {
    Pedantic,
    Permissive,
}

impl From<ReplayModeArg> for ReplayMode {
    fn from(mode: ReplayModeArg) -> Self {
        match mode {
            ReplayModeArg::Pedantic => ReplayMode::Pedantic,
            ReplayModeArg::Permissive => ReplayMode::Permissive,
        }
    }
}

/// Sorts each assigned ticker's grouped log and replays it through a live
/// order book, emitting enriched per-row output.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "stage2", version, about)]
pub struct Stage2Cli {
    /// Feed date, `MMDDYY`.
    #[arg(value_parser = parse_feed_date)]
    pub date: String,
    /// Total number of shards this run is split across.
    pub shard_count: u32,
    /// This shard's rank, `0..shard_count`.
    pub shard_rank: u32,
    /// Overrides the configured data root for this invocation.
    #[arg(long, env = "ITCH_DATA_ROOT")]
    pub data_root: Option<PathBuf>,
    /// How to react to a book-inconsistency (`BookInconsistencyError`).
    #[arg(long, value_enum, default_value_t = ReplayModeArg::Permissive)]
    pub mode: ReplayModeArg,
    /// Increase log verbosity (`-v` debug, `-vv` trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage1_parses_positional_and_flags() {
        let cli = Stage1Cli::try_parse_from([
            "stage1",
            "062419",
            "4",
            "1",
            "--cache-max",
            "500",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.date, "062419");
        assert_eq!(cli.shard_count, 4);
        assert_eq!(cli.shard_rank, 1);
        assert_eq!(cli.cache_max, 500);
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn stage1_rejects_missing_positional() {
        assert!(Stage1Cli::try_parse_from(["stage1", "062419"]).is_err());
    }

    #[test]
    fn stage1_rejects_invalid_calendar_date() {
        assert!(Stage1Cli::try_parse_from(["stage1", "134199", "4", "1"]).is_err());
    }

    #[test]
    fn stage2_defaults_to_permissive_mode() {
        let cli = Stage2Cli::try_parse_from(["stage2", "062419", "2", "0"]).unwrap();
        assert_eq!(cli.mode, ReplayModeArg::Permissive);
    }

    #[test]
    fn stage2_parses_pedantic_mode_flag() {
        let cli = Stage2Cli::try_parse_from(["stage2", "062419", "2", "0", "--mode", "pedantic"]).unwrap();
        assert_eq!(cli.mode, ReplayModeArg::Pedantic);
    }
}
