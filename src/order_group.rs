//! `OrderGroup`: the append-only event log for one resting order.
//!
//! Grounded on `ITCH/processing/grouped_order.py`'s `OrderGroup` class: one
//! instance per originally-added order (A/F/P, or the order spawned by a
//! U-replace), mutated in place by every later E/C/X/D/U/B event that
//! references its order-reference number, and serialized to CSV text once
//! its outstanding shares reach zero.

use crate::common::{kind, Price, Side};

/// One row in an `OrderGroup`'s history. `kind` carries the `-B` suffix
/// rewrite when a broken trade reverts this entry (see `apply_broken_trade`)
/// — the only mutation of a past entry anywhere in the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub kind: String,
    pub seconds: f64,
    pub delta_shares: u32,
    pub price: Price,
    pub remaining: u64,
}

impl LogEntry {
    fn new(kind: &str, seconds_ns: u64, delta_shares: u32, price: Price, remaining: u64) -> Self {
        LogEntry {
            kind: kind.to_string(),
            seconds: seconds_ns as f64 / 1e9,
            delta_shares,
            price,
            remaining,
        }
    }
}

/// The lifetime history of one order: how it was added, and every execute,
/// cancel, delete, replace, or broken-trade event that followed.
#[derive(Debug, Clone)]
pub struct OrderGroup {
    pub origin_kind: u8,
    pub orn: i64,
    pub side: Side,
    pub stock: String,
    pub mpid: Option<String>,
    pub shares: u64,
    pub price: Price,
    pub log: Vec<LogEntry>,
}

impl OrderGroup {
    /// Builds the group created by an Add Order / Add Order w/ MPID message.
    pub fn from_add(
        origin_kind: u8,
        orn: i64,
        side: Side,
        stock: String,
        shares: u32,
        price: Price,
        mpid: Option<String>,
        seconds_ns: u64,
    ) -> Self {
        let tag = (origin_kind as char).to_string();
        let mut group = OrderGroup {
            origin_kind,
            orn,
            side,
            stock,
            mpid,
            shares: shares as u64,
            price,
            log: Vec::new(),
        };
        group
            .log
            .push(LogEntry::new(&tag, seconds_ns, shares, price, shares as u64));
        group
    }

    /// Builds the never-resting pseudo-order spawned by a hidden-execution
    /// (P) message. `shares` is recorded as the delta but `remaining` is 0
    /// because the order never rested on the book.
    pub fn from_hidden(
        orn: i64,
        side: Side,
        stock: String,
        shares: u32,
        price: Price,
        seconds_ns: u64,
    ) -> Self {
        let mut group = OrderGroup {
            origin_kind: kind::TRADE_NON_CROSS,
            orn,
            side,
            stock,
            mpid: None,
            shares: 0,
            price,
            log: Vec::new(),
        };
        group.log.push(LogEntry::new("P", seconds_ns, shares, price, 0));
        group
    }

    /// Builds the group spawned by a replace (U) at the new order-reference
    /// number, inheriting side/stock/MPID from the group it replaced.
    pub fn from_replace(
        new_orn: i64,
        side: Side,
        stock: String,
        mpid: Option<String>,
        shares: u32,
        price: Price,
        seconds_ns: u64,
    ) -> Self {
        let mut group = OrderGroup {
            origin_kind: kind::ORDER_REPLACE,
            orn: new_orn,
            side,
            stock,
            mpid,
            shares: shares as u64,
            price,
            log: Vec::new(),
        };
        group
            .log
            .push(LogEntry::new("U", seconds_ns, shares, price, shares as u64));
        group
    }

    pub fn is_closed(&self) -> bool {
        self.shares == 0
    }

    /// Subtracts `delta` from outstanding shares, clamping to zero and
    /// logging a warning if `delta` overdraws what is resting.
    fn clamp_subtract(&mut self, delta: u32) -> u32 {
        let delta64 = delta as u64;
        if delta64 > self.shares {
            let actual = self.shares as u32;
            tracing::warn!(
                orn = self.orn,
                stock = %self.stock,
                requested = delta,
                available = self.shares,
                "order-group overdelete clamped to available shares"
            );
            self.shares = 0;
            actual
        } else {
            self.shares -= delta64;
            delta
        }
    }

    /// Applies an Order Executed (E) event. Returns the log index, used by
    /// the caller to populate the match table for a later broken-trade.
    pub fn apply_execute(&mut self, seconds_ns: u64, executed_shares: u32) -> usize {
        let actual = self.clamp_subtract(executed_shares);
        self.log
            .push(LogEntry::new("E", seconds_ns, actual, self.price, self.shares));
        self.log.len() - 1
    }

    /// Applies an Order Executed w/ Price (C) event. The log entry records
    /// the print price, not the order's resting price; the outstanding-share
    /// arithmetic still uses the resting quantity.
    pub fn apply_execute_with_price(
        &mut self,
        seconds_ns: u64,
        executed_shares: u32,
        print_price: Price,
    ) -> usize {
        let actual = self.clamp_subtract(executed_shares);
        self.log
            .push(LogEntry::new("C", seconds_ns, actual, print_price, self.shares));
        self.log.len() - 1
    }

    /// Applies an Order Cancel (X) event.
    pub fn apply_cancel(&mut self, seconds_ns: u64, cancelled_shares: u32) {
        let actual = self.clamp_subtract(cancelled_shares);
        self.log
            .push(LogEntry::new("X", seconds_ns, actual, self.price, self.shares));
    }

    /// Applies an Order Delete (D) event: the remaining outstanding shares
    /// all leave at once.
    pub fn apply_delete(&mut self, seconds_ns: u64) {
        let delta = self.shares as u32;
        self.log.push(LogEntry::new("D", seconds_ns, delta, self.price, 0));
        self.shares = 0;
    }

    /// Applies the close half of an Order Replace (U): the old order group
    /// is fully delisted, its closing log line recording 0 remaining at the
    /// *old* price (the replace's new price belongs to the spawned group,
    /// not this one). Returns what the caller needs to construct the new
    /// group at the new ORN.
    pub fn apply_replace_close(&mut self, seconds_ns: u64) -> (Side, String, Option<String>) {
        let delta = self.shares as u32;
        self.log.push(LogEntry::new("U", seconds_ns, delta, self.price, 0));
        self.shares = 0;
        (self.side, self.stock.clone(), self.mpid.clone())
    }

    /// Applies a Broken Trade (B): reverts the referenced log entry (tagging
    /// it with a `-B` suffix), restores its shares to outstanding, and
    /// appends a new `B` entry recording the reversal.
    pub fn apply_broken_trade(&mut self, log_index: usize, seconds_ns: u64) {
        let (reverted_shares, reverted_price) = {
            let entry = &mut self.log[log_index];
            entry.kind.push_str("-B");
            (entry.delta_shares, entry.price)
        };
        self.shares += reverted_shares as u64;
        self.log.push(LogEntry::new(
            "B",
            seconds_ns,
            reverted_shares,
            reverted_price,
            self.shares,
        ));
    }

    /// Formats every log entry as one `type, seconds, orn, side, shares,
    /// price, shares_remaining` CSV row.
    pub fn to_csv_rows(&self) -> Vec<String> {
        self.log
            .iter()
            .map(|e| {
                format!(
                    "{}, {:.7}, {}, {}, {}, {:.4}, {}\n",
                    e.kind,
                    e.seconds,
                    self.orn,
                    self.side.as_byte() as char,
                    e.delta_shares,
                    e.price.as_dollars(),
                    e.remaining
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(dollars: u32) -> Price {
        Price::from_wire(dollars * 10_000)
    }

    #[test]
    fn add_then_partial_execute_leaves_remainder() {
        let mut g = OrderGroup::from_add(
            kind::ADD_ORDER,
            1,
            Side::Buy,
            "AAPL".into(),
            100,
            p(10),
            None,
            34_200_000_000_000,
        );
        let idx = g.apply_execute(34_201_000_000_000, 40);
        assert_eq!(g.shares, 60);
        assert_eq!(g.log[idx].remaining, 60);
        assert!(!g.is_closed());
    }

    #[test]
    fn delete_zeroes_outstanding_and_closes() {
        let mut g = OrderGroup::from_add(
            kind::ADD_ORDER,
            1,
            Side::Sell,
            "AAPL".into(),
            50,
            p(10),
            None,
            0,
        );
        g.apply_delete(1);
        assert!(g.is_closed());
        assert_eq!(g.log.last().unwrap().remaining, 0);
    }

    #[test]
    fn overdelete_clamps_to_zero_instead_of_negative() {
        let mut g = OrderGroup::from_add(
            kind::ADD_ORDER,
            1,
            Side::Buy,
            "AAPL".into(),
            10,
            p(10),
            None,
            0,
        );
        g.apply_cancel(1, 999);
        assert_eq!(g.shares, 0);
        assert!(g.is_closed());
    }

    #[test]
    fn broken_trade_rewrites_prior_entry_and_restores_shares() {
        let mut g = OrderGroup::from_add(
            kind::ADD_ORDER,
            1,
            Side::Buy,
            "AAPL".into(),
            100,
            p(10),
            None,
            0,
        );
        let idx = g.apply_execute(1, 40);
        assert_eq!(g.shares, 60);
        g.apply_broken_trade(idx, 2);
        assert_eq!(g.log[idx].kind, "E-B");
        assert_eq!(g.shares, 100);
        assert_eq!(g.log.last().unwrap().kind, "B");
        assert_eq!(g.log.last().unwrap().remaining, 100);
    }

    #[test]
    fn hidden_order_never_rests() {
        let g = OrderGroup::from_hidden(-1, Side::Sell, "AAPL".into(), 25, p(10), 0);
        assert_eq!(g.shares, 0);
        assert_eq!(g.log.len(), 1);
        assert_eq!(g.log[0].remaining, 0);
        assert!(g.is_closed());
    }

    #[test]
    fn csv_row_formatting_uses_documented_columns() {
        let g = OrderGroup::from_add(
            kind::ADD_ORDER,
            42,
            Side::Buy,
            "AAPL".into(),
            100,
            p(10),
            None,
            34_200_000_000_000,
        );
        let rows = g.to_csv_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], "A, 34200.0000000, 42, B, 100, 10.0000, 100\n");
    }
}
