//! Partitioning controller: assigns tickers to worker shards.
//!
//! Grounded on `grouped_order.py`'s `self.no_tickers % self.size == self.rank`
//! for stage 1 and `process_orderbooks.py`'s `tickers[rank::size]` (applied
//! to tickers pre-sorted by grouped-file size ascending) for stage 2.

use std::path::Path;

/// A deterministic `(shard_count, shard_rank)` pair. `shard_rank` is
/// `0..shard_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardAssignment {
    pub shard_count: u32,
    pub shard_rank: u32,
}

impl ShardAssignment {
    pub fn new(shard_count: u32, shard_rank: u32) -> Self {
        assert!(shard_count > 0, "shard_count must be positive");
        assert!(shard_rank < shard_count, "shard_rank must be < shard_count");
        ShardAssignment { shard_count, shard_rank }
    }

    /// Stage 1: does the `position`-th distinct R-message symbol (in
    /// encounter order) belong to this shard?
    pub fn owns_position(&self, position: u64) -> bool {
        position % self.shard_count as u64 == self.shard_rank as u64
    }

    /// Stage 2: this shard's subset of `tickers_by_size_asc` (already
    /// sorted ascending by on-disk grouped-file size).
    pub fn assigned_tickers<'a>(&self, tickers_by_size_asc: &'a [String]) -> Vec<&'a str> {
        tickers_by_size_asc
            .iter()
            .skip(self.shard_rank as usize)
            .step_by(self.shard_count as usize)
            .map(String::as_str)
            .collect()
    }
}

/// Lists the tickers with a grouped file under `grouped_dir`, sorted
/// ascending by file size, for `ShardAssignment::assigned_tickers`.
pub fn grouped_tickers_by_size(grouped_dir: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(grouped_dir)? {
        let entry = entry?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(ticker) = extract_ticker(name) else {
            continue;
        };
        let size = entry.metadata()?.len();
        entries.push((ticker, size));
    }
    entries.sort_by_key(|(_, size)| *size);
    Ok(entries.into_iter().map(|(ticker, _)| ticker).collect())
}

fn extract_ticker(filename: &str) -> Option<String> {
    let rest = filename.strip_prefix("OrderGroups_")?;
    let rest = rest.strip_suffix(".csv.gz")?;
    let (_date, ticker) = rest.split_once('_')?;
    Some(ticker.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shards_partition_disjointly() {
        let positions: Vec<u64> = (0..10).collect();
        let a = ShardAssignment::new(3, 0);
        let b = ShardAssignment::new(3, 1);
        let c = ShardAssignment::new(3, 2);
        for p in positions {
            let owners = [a.owns_position(p), b.owns_position(p), c.owns_position(p)];
            assert_eq!(owners.iter().filter(|&&o| o).count(), 1);
        }
    }

    #[test]
    fn assigned_tickers_is_modulo_slice() {
        let tickers: Vec<String> = vec!["A", "B", "C", "D", "E"].into_iter().map(String::from).collect();
        let shard = ShardAssignment::new(2, 1);
        assert_eq!(shard.assigned_tickers(&tickers), vec!["B", "D"]);
    }

    #[test]
    fn ticker_extraction_from_grouped_filename() {
        assert_eq!(
            extract_ticker("OrderGroups_062419_AAPL.csv.gz"),
            Some("AAPL".to_string())
        );
        assert_eq!(extract_ticker("not_a_grouped_file.txt"), None);
    }
}
