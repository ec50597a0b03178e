//! Directory layout: pure functions computing where the binary feed, the
//! stage-1 grouped CSVs, and the stage-2 processed CSVs live under a data
//! root, replacing the original's `locations.py` `chdir` decorators (Design
//! Notes §9, "Global-ish file layout state"). Nothing here mutates process
//! state; every path is threaded explicitly through the stages that need it.

use std::path::{Path, PathBuf};

/// The configured data root plus the pure path-computation helpers layered
/// on top of it. See [`crate::config`] for how this is resolved from the
/// environment or a config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRoot(PathBuf);

impl DataRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DataRoot(root.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// `<root>/binary_data/<year>/S<date>-v50.txt.gz`
    pub fn binary_file(&self, date: &str) -> PathBuf {
        self.0
            .join("binary_data")
            .join(year_of(date))
            .join(format!("S{date}-v50.txt.gz"))
    }

    /// `<root>/grouped_data/<year>/<date>/`
    pub fn grouped_dir(&self, date: &str) -> PathBuf {
        self.0.join("grouped_data").join(year_of(date)).join(date)
    }

    /// `<root>/grouped_data/<year>/<date>/OrderGroups_<date>_<ticker>.csv.gz`
    pub fn grouped_file(&self, date: &str, ticker: &str) -> PathBuf {
        self.grouped_dir(date)
            .join(format!("OrderGroups_{date}_{ticker}.csv.gz"))
    }

    /// `<root>/processed_data/<year>/<date>/`
    pub fn processed_dir(&self, date: &str) -> PathBuf {
        self.0.join("processed_data").join(year_of(date)).join(date)
    }

    /// `<root>/processed_data/<year>/<date>/<date>_<ticker>.csv.gz`
    pub fn processed_file(&self, date: &str, ticker: &str) -> PathBuf {
        self.processed_dir(date)
            .join(format!("{date}_{ticker}.csv.gz"))
    }
}

/// `MMDDYY` -> `20YY`, the per-year directory prefix each output path nests under.
fn year_of(date: &str) -> String {
    format!("20{}", &date[4..6.min(date.len())])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_expected_paths() {
        let root = DataRoot::new("/data");
        assert_eq!(
            root.binary_file("062419"),
            PathBuf::from("/data/binary_data/2019/S062419-v50.txt.gz")
        );
        assert_eq!(
            root.grouped_file("062419", "AAPL"),
            PathBuf::from("/data/grouped_data/2019/062419/OrderGroups_062419_AAPL.csv.gz")
        );
        assert_eq!(
            root.processed_file("062419", "AAPL"),
            PathBuf::from("/data/processed_data/2019/062419/062419_AAPL.csv.gz")
        );
    }
}
