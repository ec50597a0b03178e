//! `StreamGrouper`: Stage 1. Runs the decoded message stream through a
//! dispatch table, maintains the live ORN -> `OrderGroup` table and match
//! table, and routes completed orders into per-ticker write caches that
//! flush to the grouped CSV files.
//!
//! Grounded on `ITCH/processing/grouped_order.py`'s `ParallelDay`: the
//! `mess_types` dispatch dict becomes an exhaustive `match` over
//! [`Message`]; `self.groups`/`self.match_no`/`self.write_cache` map
//! directly onto the fields below.

use std::collections::{HashMap, HashSet};

use crate::book::GroupedRow;
use crate::common::{kind, trim_stock_symbol, Price, Side};
use crate::csvio::{append_grouped_rows, write_grouped_header};
use crate::error::IoError;
use crate::layout::DataRoot;
use crate::message::Message;
use crate::order_group::OrderGroup;
use crate::partition::ShardAssignment;

fn parse_side(byte: u8) -> Side {
    Side::from_byte(byte).unwrap_or_else(|| {
        tracing::warn!(byte, "unrecognized side indicator, defaulting to Buy");
        Side::Buy
    })
}

/// Owns the complete Stage 1 state for one `(date, shard)`.
pub struct StreamGrouper {
    date: String,
    shard: ShardAssignment,
    data_root: DataRoot,
    cache_max: usize,

    groups: HashMap<i64, OrderGroup>,
    match_no: HashMap<u64, (i64, usize)>,
    write_cache: HashMap<String, Vec<String>>,
    tickers: HashSet<String>,
    all_tickers: HashSet<String>,

    ticker_position: u64,
    hidden_counter: u64,
    message_count: u64,
    keep_processing: bool,
}

impl StreamGrouper {
    pub fn new(date: String, shard: ShardAssignment, data_root: DataRoot, cache_max: usize) -> Self {
        StreamGrouper {
            date,
            shard,
            data_root,
            cache_max,
            groups: HashMap::new(),
            match_no: HashMap::new(),
            write_cache: HashMap::new(),
            tickers: HashSet::new(),
            all_tickers: HashSet::new(),
            ticker_position: 0,
            hidden_counter: 0,
            message_count: 0,
            keep_processing: true,
        }
    }

    pub fn keep_processing(&self) -> bool {
        self.keep_processing
    }

    pub fn tickers(&self) -> &HashSet<String> {
        &self.tickers
    }

    /// Dispatches one decoded message. Mirrors `ParallelDay.process_next`.
    pub fn dispatch(&mut self, msg: &Message) -> Result<(), IoError> {
        self.message_count += 1;
        if self.message_count % 1_000_000 == 0 {
            tracing::info!(
                rank = self.shard.shard_rank,
                shard_count = self.shard.shard_count,
                millions = self.message_count / 1_000_000,
                "messages read"
            );
        }

        match msg {
            Message::SystemEvent(s) => {
                if s.event_code == b'C' {
                    self.keep_processing = false;
                }
            }
            Message::StockDirectory(r) => self.handle_stock_directory(r.stock, r.header.timestamp_ns),
            Message::AddOrder(a) => self.handle_add(
                kind::ADD_ORDER,
                a.orn as i64,
                a.side,
                a.stock,
                a.shares,
                a.price,
                None,
                a.header.timestamp_ns,
            ),
            Message::AddOrderMpid(f) => self.handle_add(
                kind::ADD_ORDER_MPID,
                f.orn as i64,
                f.side,
                f.stock,
                f.shares,
                f.price,
                Some(f.mpid),
                f.header.timestamp_ns,
            ),
            Message::TradeNonCross(p) => self.handle_hidden(p.stock, p.side, p.shares, p.price, p.header.timestamp_ns)?,
            Message::OrderExecuted(e) => self.handle_execute(e.orn as i64, e.executed_shares, e.match_number, e.header.timestamp_ns)?,
            Message::OrderExecutedWithPrice(c) => self.handle_execute_with_price(
                c.orn as i64,
                c.executed_shares,
                c.match_number,
                c.price,
                c.header.timestamp_ns,
            )?,
            Message::OrderCancel(x) => self.handle_cancel(x.orn as i64, x.cancelled_shares, x.header.timestamp_ns)?,
            Message::OrderDelete(d) => self.handle_delete(d.orn as i64, d.header.timestamp_ns)?,
            Message::OrderReplace(u) => self.handle_replace(
                u.original_orn as i64,
                u.new_orn as i64,
                u.shares,
                u.price,
                u.header.timestamp_ns,
            )?,
            Message::BrokenTrade(b) => self.handle_broken(b.match_number, b.header.timestamp_ns),
            // H, Y, L, I, N, Q, V, W, K, J: decoded upstream but never alter book state.
            _ => {}
        }
        Ok(())
    }

    fn handle_stock_directory(&mut self, raw_stock: [u8; 8], _timestamp_ns: u64) {
        let ticker = trim_stock_symbol(&raw_stock);
        let owns = self.shard.owns_position(self.ticker_position);
        if owns {
            if self.all_tickers.contains(&ticker) {
                tracing::debug!(ticker = %ticker, "duplicate stock-directory message for an already-assigned ticker");
            } else {
                self.tickers.insert(ticker.clone());
                let path = self.data_root.grouped_file(&self.date, &ticker);
                if let Err(e) = write_grouped_header(&path) {
                    tracing::error!(ticker = %ticker, error = %e, "failed to write grouped-file header");
                }
            }
        }
        self.ticker_position += 1;
        self.all_tickers.insert(ticker);
    }

    #[allow(clippy::too_many_arguments)]
    fn handle_add(
        &mut self,
        origin_kind: u8,
        orn: i64,
        side_byte: u8,
        raw_stock: [u8; 8],
        shares: u32,
        price_raw: u32,
        mpid_raw: Option<[u8; 4]>,
        timestamp_ns: u64,
    ) {
        let stock = trim_stock_symbol(&raw_stock);
        if !self.tickers.contains(&stock) {
            return;
        }
        let side = parse_side(side_byte);
        let price = Price::from_wire(price_raw);
        let mpid = mpid_raw.map(|m| String::from_utf8_lossy(&m).trim().to_string());
        let group = OrderGroup::from_add(origin_kind, orn, side, stock, shares, price, mpid, timestamp_ns);
        self.groups.insert(orn, group);
    }

    fn handle_hidden(
        &mut self,
        raw_stock: [u8; 8],
        side_byte: u8,
        shares: u32,
        price_raw: u32,
        timestamp_ns: u64,
    ) -> Result<(), IoError> {
        self.hidden_counter += 1;
        let stock = trim_stock_symbol(&raw_stock);
        if !self.tickers.contains(&stock) {
            return Ok(());
        }
        let side = parse_side(side_byte);
        let price = Price::from_wire(price_raw);
        let synthetic_orn = -(self.hidden_counter as i64);
        let group = OrderGroup::from_hidden(synthetic_orn, side, stock, shares, price, timestamp_ns);
        self.close_group(group)
    }

    fn handle_execute(&mut self, orn: i64, executed_shares: u32, match_number: u64, timestamp_ns: u64) -> Result<(), IoError> {
        let Some(group) = self.groups.get_mut(&orn) else {
            tracing::debug!(orn, "execute referenced an unknown order reference number");
            return Ok(());
        };
        let idx = group.apply_execute(timestamp_ns, executed_shares);
        self.match_no.insert(match_number, (orn, idx));
        if group.is_closed() {
            self.finalize(orn)?;
        }
        Ok(())
    }

    fn handle_execute_with_price(
        &mut self,
        orn: i64,
        executed_shares: u32,
        match_number: u64,
        print_price_raw: u32,
        timestamp_ns: u64,
    ) -> Result<(), IoError> {
        let Some(group) = self.groups.get_mut(&orn) else {
            tracing::debug!(orn, "execute-with-price referenced an unknown order reference number");
            return Ok(());
        };
        let idx = group.apply_execute_with_price(timestamp_ns, executed_shares, Price::from_wire(print_price_raw));
        self.match_no.insert(match_number, (orn, idx));
        if group.is_closed() {
            self.finalize(orn)?;
        }
        Ok(())
    }

    fn handle_cancel(&mut self, orn: i64, cancelled_shares: u32, timestamp_ns: u64) -> Result<(), IoError> {
        let Some(group) = self.groups.get_mut(&orn) else {
            tracing::debug!(orn, "cancel referenced an unknown order reference number");
            return Ok(());
        };
        group.apply_cancel(timestamp_ns, cancelled_shares);
        if group.is_closed() {
            self.finalize(orn)?;
        }
        Ok(())
    }

    fn handle_delete(&mut self, orn: i64, timestamp_ns: u64) -> Result<(), IoError> {
        let Some(group) = self.groups.get_mut(&orn) else {
            tracing::debug!(orn, "delete referenced an unknown order reference number");
            return Ok(());
        };
        group.apply_delete(timestamp_ns);
        self.finalize(orn)
    }

    fn handle_replace(
        &mut self,
        old_orn: i64,
        new_orn: i64,
        new_shares: u32,
        new_price_raw: u32,
        timestamp_ns: u64,
    ) -> Result<(), IoError> {
        let Some(mut group) = self.groups.remove(&old_orn) else {
            tracing::debug!(orn = old_orn, "replace referenced an unknown order reference number");
            return Ok(());
        };
        let (side, stock, mpid) = group.apply_replace_close(timestamp_ns);
        self.close_group(group)?;
        let new_group = OrderGroup::from_replace(
            new_orn,
            side,
            stock,
            mpid,
            new_shares,
            Price::from_wire(new_price_raw),
            timestamp_ns,
        );
        self.groups.insert(new_orn, new_group);
        Ok(())
    }

    fn handle_broken(&mut self, match_number: u64, timestamp_ns: u64) {
        let Some(&(orn, log_index)) = self.match_no.get(&match_number) else {
            tracing::debug!(match_number, "broken trade referenced an unknown match number");
            return;
        };
        match self.groups.get_mut(&orn) {
            Some(group) => group.apply_broken_trade(log_index, timestamp_ns),
            None => tracing::debug!(match_number, orn, "broken trade referenced an order already closed or out of shard"),
        }
    }

    fn finalize(&mut self, orn: i64) -> Result<(), IoError> {
        if let Some(group) = self.groups.remove(&orn) {
            self.close_group(group)?;
        }
        Ok(())
    }

    fn close_group(&mut self, group: OrderGroup) -> Result<(), IoError> {
        let ticker = group.stock.clone();
        let rows = self.write_cache.entry(ticker.clone()).or_default();
        rows.extend(group.to_csv_rows());
        if rows.len() >= self.cache_max {
            self.flush_ticker(&ticker)?;
        }
        Ok(())
    }

    fn flush_ticker(&mut self, ticker: &str) -> Result<(), IoError> {
        let Some(rows) = self.write_cache.get_mut(ticker) else {
            return Ok(());
        };
        if rows.is_empty() {
            return Ok(());
        }
        let pending = std::mem::take(rows);
        let path = self.data_root.grouped_file(&self.date, ticker);
        append_grouped_rows(&path, &pending)
    }

    /// Flushes every remaining cached row, plus every order still resting
    /// at end of stream (it never formally "closed", but the day is over
    /// and `to_csv`'s leftover pass in the original writes it out anyway).
    pub fn finish(&mut self) -> Result<(), IoError> {
        let leftover: Vec<OrderGroup> = self.groups.drain().map(|(_, g)| g).collect();
        for group in leftover {
            let ticker = group.stock.clone();
            self.write_cache.entry(ticker).or_default().extend(group.to_csv_rows());
        }
        let tickers: Vec<String> = self.write_cache.keys().cloned().collect();
        for ticker in tickers {
            self.flush_ticker(&ticker)?;
        }
        Ok(())
    }
}

/// Converts a [`crate::order_group::LogEntry`] plus its owning group's
/// `(orn, side)` into the row shape `BookState::apply` expects. Used by
/// tests and by anything replaying a grouper's output in-process without
/// going through the CSV round-trip.
pub fn log_entry_to_grouped_row(orn: i64, side: Side, entry: &crate::order_group::LogEntry) -> GroupedRow {
    GroupedRow {
        kind: entry.kind.clone(),
        seconds: entry.seconds,
        orn,
        side,
        delta_shares: entry.delta_shares,
        price: entry.price,
        remaining: entry.remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::*;
    use tempfile::tempdir;

    fn header(ts: u64) -> MessageHeader {
        MessageHeader {
            stock_locate: 1,
            tracking_number: 0,
            timestamp_ns: ts,
        }
    }

    fn stock(sym: &str) -> [u8; 8] {
        let mut s = [b' '; 8];
        s[..sym.len()].copy_from_slice(sym.as_bytes());
        s
    }

    fn new_grouper(dir: &std::path::Path) -> StreamGrouper {
        StreamGrouper::new(
            "062419".to_string(),
            ShardAssignment::new(1, 0),
            DataRoot::new(dir),
            1000,
        )
    }

    #[test]
    fn add_execute_delete_lifecycle_closes_and_flushes() {
        let dir = tempdir().unwrap();
        let mut g = new_grouper(dir.path());

        g.dispatch(&Message::StockDirectory(StockDirectory {
            header: header(0),
            stock: stock("AAPL"),
            market_category: b'Q',
            financial_status_indicator: b' ',
            round_lot_size: 100,
            round_lots_only: b'N',
            issue_classification: b'C',
            issue_sub_type: *b"  ",
            authenticity: b'P',
            short_sale_threshold: b'N',
            ipo_flag: b' ',
            luld_reference_price_tier: b' ',
            etp_flag: b'N',
            etp_leverage_factor: 0,
            inverse_indicator: b'N',
        }))
        .unwrap();
        assert!(g.tickers().contains("AAPL"));

        g.dispatch(&Message::AddOrder(AddOrder {
            header: header(34_200_000_000_000),
            orn: 1,
            side: b'B',
            shares: 100,
            stock: stock("AAPL"),
            price: 100_000,
        }))
        .unwrap();
        assert!(g.groups.contains_key(&1));

        g.dispatch(&Message::OrderExecuted(OrderExecuted {
            header: header(34_201_000_000_000),
            orn: 1,
            executed_shares: 40,
            match_number: 7,
        }))
        .unwrap();
        assert_eq!(g.groups[&1].shares, 60);
        assert_eq!(g.match_no[&7], (1, 1));

        g.dispatch(&Message::OrderDelete(OrderDelete {
            header: header(34_202_000_000_000),
            orn: 1,
        }))
        .unwrap();
        assert!(!g.groups.contains_key(&1));

        g.finish().unwrap();
        let path = g.data_root.grouped_file(&g.date, "AAPL");
        let rows = crate::csvio::read_grouped_csv(&path).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].kind, "A");
        assert_eq!(rows[1].kind, "E");
        assert_eq!(rows[2].kind, "D");
    }

    #[test]
    fn lookup_miss_on_unknown_orn_is_tolerated() {
        let dir = tempdir().unwrap();
        let mut g = new_grouper(dir.path());
        let result = g.dispatch(&Message::OrderCancel(OrderCancel {
            header: header(0),
            orn: 999,
            cancelled_shares: 10,
        }));
        assert!(result.is_ok());
    }

    #[test]
    fn replace_spawns_new_group_and_closes_old() {
        let dir = tempdir().unwrap();
        let mut g = new_grouper(dir.path());
        g.dispatch(&Message::StockDirectory(StockDirectory {
            header: header(0),
            stock: stock("MSFT"),
            market_category: b'Q',
            financial_status_indicator: b' ',
            round_lot_size: 100,
            round_lots_only: b'N',
            issue_classification: b'C',
            issue_sub_type: *b"  ",
            authenticity: b'P',
            short_sale_threshold: b'N',
            ipo_flag: b' ',
            luld_reference_price_tier: b' ',
            etp_flag: b'N',
            etp_leverage_factor: 0,
            inverse_indicator: b'N',
        }))
        .unwrap();
        g.dispatch(&Message::AddOrder(AddOrder {
            header: header(0),
            orn: 2,
            side: b'S',
            shares: 50,
            stock: stock("MSFT"),
            price: 100_500,
        }))
        .unwrap();
        g.dispatch(&Message::OrderReplace(OrderReplace {
            header: header(1),
            original_orn: 2,
            new_orn: 3,
            shares: 30,
            price: 101_000,
        }))
        .unwrap();
        assert!(!g.groups.contains_key(&2));
        assert!(g.groups.contains_key(&3));
        assert_eq!(g.groups[&3].side, Side::Sell);
        assert_eq!(g.groups[&3].stock, "MSFT");
    }

    #[test]
    fn system_close_event_stops_processing() {
        let dir = tempdir().unwrap();
        let mut g = new_grouper(dir.path());
        assert!(g.keep_processing());
        g.dispatch(&Message::SystemEvent(SystemEvent {
            header: header(0),
            event_code: b'C',
        }))
        .unwrap();
        assert!(!g.keep_processing());
    }
}
