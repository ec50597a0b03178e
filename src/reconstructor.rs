//! `OrderBookReconstructor`: Stage 2. Reads one ticker's grouped rows, sorts
//! them into replay order, drives a [`BookState`], and writes the enriched
//! per-row output CSV.
//!
//! Grounded on `ITCH/processing/process_orderbooks.py`'s `new_investigator`:
//! the `sort_values(['seconds'], ascending=...)` + `apply_book` loop becomes
//! `reconstruct_ticker` below, with `BookInconsistencyError` detection added
//! ahead of each `BookState::apply` call rather than inside it, so `BookState`
//! itself stays a pure, infallible replay core.

use std::path::Path;

use thiserror::Error;

use crate::book::{BookState, EnrichedRow, GroupedRow};
use crate::csvio::{read_grouped_csv, ProcessedCsvWriter};
use crate::error::{BookError, IoError, ReplayMode};
use crate::layout::DataRoot;
use crate::partition::ShardAssignment;

const FLUSH_EVERY: usize = 5_000;

/// A source of grouped rows for one ticker. The NASDAQ CSV adapter below is
/// the only implementation in this crate; the trait exists so a future
/// NYSE-format grouped-row producer can feed the same replay core without
/// changing `OrderBookReconstructor`.
pub trait GroupedRowSource {
    fn read_rows(&self) -> Result<Vec<GroupedRow>, IoError>;
}

/// Reads a NASDAQ-style gzipped grouped CSV, as produced by `grouper.rs`.
pub struct NasdaqGroupedCsv<'a> {
    pub path: &'a Path,
}

impl GroupedRowSource for NasdaqGroupedCsv<'_> {
    fn read_rows(&self) -> Result<Vec<GroupedRow>, IoError> {
        read_grouped_csv(self.path)
    }
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error(transparent)]
    Book(#[from] BookError),
    #[error(transparent)]
    Io(#[from] IoError),
}

/// Drives a single ticker's grouped rows through a [`BookState`] in
/// [`ReplayMode`]-gated fashion.
pub struct OrderBookReconstructor {
    mode: ReplayMode,
}

impl OrderBookReconstructor {
    pub fn new(mode: ReplayMode) -> Self {
        OrderBookReconstructor { mode }
    }

    /// Reads, sorts, replays, and writes one ticker's grouped file to its
    /// processed output under `data_root`. Returns the number of rows written.
    pub fn reconstruct_ticker(
        &self,
        source: &dyn GroupedRowSource,
        data_root: &DataRoot,
        date: &str,
        ticker: &str,
    ) -> Result<usize, ReplayError> {
        let rows = source.read_rows()?;
        tracing::info!(ticker = %ticker, rows = rows.len(), "stage 2 replay starting");

        let intermediate = data_root.processed_dir(date).join(format!("{date}_{ticker}.csv"));
        let gz_path = data_root.processed_file(date, ticker);
        let mut writer = ProcessedCsvWriter::create(&intermediate, FLUSH_EVERY)?;

        let written = self.replay_into(rows, &mut writer)?;
        writer.finish(&gz_path)?;

        tracing::info!(ticker = %ticker, rows_written = written, "stage 2 replay finished");
        Ok(written)
    }

    /// Sorts `rows` by `(seconds asc, remaining desc)` and replays them
    /// through a fresh [`BookState`], writing one enriched row per input row.
    fn replay_into(&self, mut rows: Vec<GroupedRow>, writer: &mut ProcessedCsvWriter) -> Result<usize, ReplayError> {
        rows.sort_by(|a, b| {
            a.seconds
                .partial_cmp(&b.seconds)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.remaining.cmp(&a.remaining))
        });

        let mut book = BookState::new();
        let mut written = 0usize;
        for row in rows {
            let base_kind = row.kind.split('-').next().unwrap_or(row.kind.as_str()).to_string();
            if base_kind == "J" {
                continue;
            }

            let enriched = match self.check_consistency(&book, &row, &base_kind) {
                Some(err) => match self.mode {
                    ReplayMode::Pedantic => return Err(err.into()),
                    ReplayMode::Permissive => {
                        tracing::warn!(error = %err, orn = row.orn, "book inconsistency tolerated, row left unapplied");
                        snapshot(&book, row)
                    }
                },
                None => book.apply(row),
            };
            writer.write_row(&enriched)?;
            written += 1;
        }
        Ok(written)
    }

    /// Detects the two `BookInconsistencyError` conditions, ahead of
    /// mutating the book: a removal targeting a price the
    /// book doesn't have resting, or a partial reduction that would overdraw
    /// the resting quantity at that price.
    fn check_consistency(&self, book: &BookState, row: &GroupedRow, base_kind: &str) -> Option<BookError> {
        if base_kind == "P" {
            return None;
        }
        if row.remaining == 0 {
            if book.shares_at(row.side, row.price).is_none() {
                return Some(BookError::MissingPrice {
                    orn: row.orn,
                    side: row.side,
                    price: row.price,
                });
            }
            return None;
        }
        if matches!(base_kind, "E" | "X" | "C") {
            return match book.shares_at(row.side, row.price) {
                None => Some(BookError::MissingPrice {
                    orn: row.orn,
                    side: row.side,
                    price: row.price,
                }),
                Some(resting) if row.delta_shares as u64 > resting => Some(BookError::NegativeDepth {
                    orn: row.orn,
                    shares: row.delta_shares,
                    available: resting,
                }),
                _ => None,
            };
        }
        None
    }
}

fn snapshot(book: &BookState, row: GroupedRow) -> EnrichedRow {
    EnrichedRow {
        current_bid: book.best_bid(),
        current_ask: book.best_ask(),
        spread: book.spread(),
        ask_depth: book.ask_depth(),
        bid_depth: book.bid_depth(),
        depth: book.depth(),
        row,
    }
}

/// The tickers this shard owns for Stage 2, sorted ascending by on-disk
/// grouped-file size.
pub fn assigned_tickers_for_shard(
    data_root: &DataRoot,
    date: &str,
    shard: &ShardAssignment,
) -> std::io::Result<Vec<String>> {
    let by_size = crate::partition::grouped_tickers_by_size(&data_root.grouped_dir(date))?;
    Ok(shard
        .assigned_tickers(&by_size)
        .into_iter()
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Price, Side};
    use tempfile::tempdir;

    struct InMemory(Vec<GroupedRow>);
    impl GroupedRowSource for InMemory {
        fn read_rows(&self) -> Result<Vec<GroupedRow>, IoError> {
            Ok(self.0.clone())
        }
    }

    fn p(dollars: u32) -> Price {
        Price::from_wire(dollars * 10_000)
    }

    fn row(kind: &str, seconds: f64, side: Side, delta: u32, price: Price, remaining: u64) -> GroupedRow {
        GroupedRow {
            kind: kind.to_string(),
            seconds,
            orn: 1,
            side,
            delta_shares: delta,
            price,
            remaining,
        }
    }

    #[test]
    fn replays_in_sorted_order_and_writes_every_row() {
        let dir = tempdir().unwrap();
        let data_root = DataRoot::new(dir.path());
        let source = InMemory(vec![
            row("D", 34_201.0, Side::Buy, 100, p(10), 0),
            row("A", 34_200.0, Side::Buy, 100, p(10), 100),
        ]);
        let reconstructor = OrderBookReconstructor::new(ReplayMode::Permissive);
        let written = reconstructor
            .reconstruct_ticker(&source, &data_root, "062419", "AAPL")
            .unwrap();
        assert_eq!(written, 2);
        assert!(data_root.processed_file("062419", "AAPL").exists());
    }

    #[test]
    fn pedantic_mode_aborts_on_missing_price() {
        let dir = tempdir().unwrap();
        let data_root = DataRoot::new(dir.path());
        let source = InMemory(vec![row("X", 34_200.0, Side::Buy, 10, p(10), 5)]);
        let reconstructor = OrderBookReconstructor::new(ReplayMode::Pedantic);
        let result = reconstructor.reconstruct_ticker(&source, &data_root, "062419", "AAPL");
        assert!(matches!(result, Err(ReplayError::Book(BookError::MissingPrice { .. }))));
    }

    #[test]
    fn permissive_mode_tolerates_and_leaves_book_unchanged() {
        let dir = tempdir().unwrap();
        let data_root = DataRoot::new(dir.path());
        let source = InMemory(vec![
            row("A", 34_200.0, Side::Buy, 100, p(10), 100),
            row("X", 34_201.0, Side::Buy, 10, p(11), 90),
        ]);
        let reconstructor = OrderBookReconstructor::new(ReplayMode::Permissive);
        let written = reconstructor
            .reconstruct_ticker(&source, &data_root, "062419", "AAPL")
            .unwrap();
        assert_eq!(written, 2);
    }

    #[test]
    fn j_rows_are_skipped_entirely() {
        let dir = tempdir().unwrap();
        let data_root = DataRoot::new(dir.path());
        let source = InMemory(vec![
            row("J", 34_200.0, Side::Buy, 0, p(10), 0),
            row("A", 34_201.0, Side::Buy, 100, p(10), 100),
        ]);
        let reconstructor = OrderBookReconstructor::new(ReplayMode::Permissive);
        let written = reconstructor
            .reconstruct_ticker(&source, &data_root, "062419", "AAPL")
            .unwrap();
        assert_eq!(written, 1);
    }
}
