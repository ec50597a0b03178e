//! Gzip CSV I/O shared by both stages.
//!
//! Stage 1's per-ticker grouped files are appended to across many separate
//! `gzip.open(file, 'at')` calls in the original (`grouped_order.py`'s
//! `clear_cache`); gzip streams concatenate cleanly, so each flush here
//! opens the file in append mode and writes one more gzip member, read back
//! with [`flate2::read::MultiGzDecoder`] which transparently decodes a
//! concatenated stream. Stage 2's processed output instead accumulates in
//! a plain intermediate file and is gzip-compressed once at the end,
//! mirroring `process_orderbooks.py`'s `new_investigator`.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::book::{EnrichedRow, GroupedRow};
use crate::common::{Price, Side};
use crate::error::IoError;

pub const GROUPED_HEADER: &str = "type, seconds, orn, side, shares, price, shares_remaining\n";
pub const PROCESSED_HEADER: &str =
    "type,seconds,orn,side,shares,price,shares_remaining,current bid,current ask,spread,ask depth,bid depth,depth\n";

/// Creates (truncating) the per-ticker grouped file and writes its header
/// as the first gzip member.
pub fn write_grouped_header(path: &Path) -> Result<(), IoError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| IoError::new(path.display().to_string(), e))?;
    }
    let file = File::create(path).map_err(|e| IoError::new(path.display().to_string(), e))?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder
        .write_all(GROUPED_HEADER.as_bytes())
        .map_err(|e| IoError::new(path.display().to_string(), e))?;
    encoder
        .finish()
        .map_err(|e| IoError::new(path.display().to_string(), e))?;
    Ok(())
}

/// Appends `rows` (already-formatted CSV lines) to `path` as one more gzip
/// member. Retries once on a transient write failure.
pub fn append_grouped_rows(path: &Path, rows: &[String]) -> Result<(), IoError> {
    match append_once(path, rows) {
        Ok(()) => Ok(()),
        Err(_) => append_once(path, rows).map_err(|e| IoError::new(path.display().to_string(), e)),
    }
}

fn append_once(path: &Path, rows: &[String]) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    for row in rows {
        encoder.write_all(row.as_bytes())?;
    }
    encoder.finish()?;
    Ok(())
}

/// Reads every row of a grouped CSV (dropping the header), trimming the
/// `", "`-separated whitespace the original
/// Python writer leaves in each field.
pub fn read_grouped_csv(path: &Path) -> Result<Vec<GroupedRow>, IoError> {
    let file = File::open(path).map_err(|e| IoError::new(path.display().to_string(), e))?;
    let decoder = MultiGzDecoder::new(BufReader::new(file));
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(decoder);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| IoError::new(path.display().to_string(), io::Error::new(io::ErrorKind::InvalidData, e)))?;
        if record.len() < 7 {
            continue;
        }
        if record.get(0).map(|s| s.eq_ignore_ascii_case("type")).unwrap_or(false) {
            continue;
        }
        if let Some(row) = parse_grouped_record(&record) {
            rows.push(row);
        }
    }
    Ok(rows)
}

fn parse_grouped_record(record: &csv::StringRecord) -> Option<GroupedRow> {
    let kind = record.get(0)?.to_string();
    let seconds: f64 = record.get(1)?.parse().ok()?;
    let orn: i64 = record.get(2)?.parse().ok()?;
    let side = Side::from_byte(record.get(3)?.as_bytes().first().copied()?)?;
    let delta_shares: u32 = record.get(4)?.parse().ok()?;
    let price_dollars: f64 = record.get(5)?.parse().ok()?;
    let remaining: u64 = record.get(6)?.parse().ok()?;
    let price = Price::from_wire((price_dollars * Price::SCALE as f64).round() as u32);
    Some(GroupedRow {
        kind,
        seconds,
        orn,
        side,
        delta_shares,
        price,
        remaining,
    })
}

/// Accumulates enriched stage-2 rows into a plain intermediate CSV,
/// flushing every `flush_every` rows, the way `process_orderbooks.py`
/// periodically appends a pandas `DataFrame` chunk to `new_file`.
pub struct ProcessedCsvWriter {
    path: std::path::PathBuf,
    writer: BufWriter<File>,
    buffered: usize,
    flush_every: usize,
}

impl ProcessedCsvWriter {
    pub fn create(path: &Path, flush_every: usize) -> Result<Self, IoError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| IoError::new(path.display().to_string(), e))?;
        }
        let file = File::create(path).map_err(|e| IoError::new(path.display().to_string(), e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(PROCESSED_HEADER.as_bytes())
            .map_err(|e| IoError::new(path.display().to_string(), e))?;
        Ok(ProcessedCsvWriter {
            path: path.to_path_buf(),
            writer,
            buffered: 0,
            flush_every,
        })
    }

    pub fn write_row(&mut self, enriched: &EnrichedRow) -> Result<(), IoError> {
        let line = format_enriched_row(enriched);
        self.writer
            .write_all(line.as_bytes())
            .map_err(|e| IoError::new(self.path.display().to_string(), e))?;
        self.buffered += 1;
        if self.buffered >= self.flush_every {
            self.writer
                .flush()
                .map_err(|e| IoError::new(self.path.display().to_string(), e))?;
            self.buffered = 0;
        }
        Ok(())
    }

    /// Flushes any remainder, gzip-compresses the intermediate file to
    /// `gz_path`, and removes the intermediate — the original's final
    /// `gzip.open(...)` + `os.remove(new_file)` pass.
    pub fn finish(mut self, gz_path: &Path) -> Result<(), IoError> {
        self.writer
            .flush()
            .map_err(|e| IoError::new(self.path.display().to_string(), e))?;
        drop(self.writer);
        compress_file(&self.path, gz_path)?;
        std::fs::remove_file(&self.path).map_err(|e| IoError::new(self.path.display().to_string(), e))?;
        Ok(())
    }
}

fn compress_file(src: &Path, dst: &Path) -> Result<(), IoError> {
    let mut input = BufReader::new(File::open(src).map_err(|e| IoError::new(src.display().to_string(), e))?);
    let output = File::create(dst).map_err(|e| IoError::new(dst.display().to_string(), e))?;
    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(&mut input, &mut encoder).map_err(|e| IoError::new(dst.display().to_string(), e))?;
    encoder.finish().map_err(|e| IoError::new(dst.display().to_string(), e))?;
    Ok(())
}

fn format_enriched_row(enriched: &EnrichedRow) -> String {
    let row = &enriched.row;
    let bid = opt_price(enriched.current_bid);
    let ask = opt_price(enriched.current_ask);
    let spread = enriched
        .spread
        .map(|s| format!("{:.4}", s as f64 / Price::SCALE as f64))
        .unwrap_or_else(|| "None".to_string());
    format!(
        "{},{:.7},{},{},{},{:.4},{},{},{},{},{},{},{}\n",
        row.kind,
        row.seconds,
        row.orn,
        row.side.as_byte() as char,
        row.delta_shares,
        row.price.as_dollars(),
        row.remaining,
        bid,
        ask,
        spread,
        enriched.ask_depth,
        enriched.bid_depth,
        enriched.depth,
    )
}

fn opt_price(p: Option<Price>) -> String {
    match p {
        Some(p) => format!("{:.4}", p.as_dollars()),
        None => "None".to_string(),
    }
}

/// Used by the reconstructor to read gzipped grouped input without
/// materializing the whole decompressed stream before parsing begins.
pub fn open_decompressed(path: &Path) -> Result<impl Read, IoError> {
    let file = File::open(path).map_err(|e| IoError::new(path.display().to_string(), e))?;
    Ok(MultiGzDecoder::new(BufReader::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn header_then_two_appends_round_trip_through_multigz() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("OrderGroups_062419_AAPL.csv.gz");
        write_grouped_header(&path).unwrap();
        append_grouped_rows(&path, &[
            "A, 34200.0000000, 1, B, 100, 10.0000, 100\n".to_string(),
        ])
        .unwrap();
        append_grouped_rows(&path, &[
            "D, 34201.0000000, 1, B, 100, 10.0000, 0\n".to_string(),
        ])
        .unwrap();

        let rows = read_grouped_csv(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].kind, "A");
        assert_eq!(rows[1].kind, "D");
        assert_eq!(rows[0].price, Price::from_wire(100_000));
    }
}
