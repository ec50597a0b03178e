//! ITCH 5.0 message-kind tags and the shared `Price`/`Side` value types.

use std::fmt;

/// One-byte message kind tags, in the order ITCH 5.0 defines them.
pub mod kind {
    pub const SYSTEM_EVENT: u8 = b'S';
    pub const STOCK_DIRECTORY: u8 = b'R';
    pub const STOCK_TRADING_ACTION: u8 = b'H';
    pub const REG_SHO_RESTRICTION: u8 = b'Y';
    pub const MARKET_PARTICIPANT_POSITION: u8 = b'L';
    pub const ADD_ORDER: u8 = b'A';
    pub const ADD_ORDER_MPID: u8 = b'F';
    pub const ORDER_EXECUTED: u8 = b'E';
    pub const ORDER_EXECUTED_WITH_PRICE: u8 = b'C';
    pub const ORDER_CANCEL: u8 = b'X';
    pub const ORDER_DELETE: u8 = b'D';
    pub const ORDER_REPLACE: u8 = b'U';
    pub const TRADE_NON_CROSS: u8 = b'P';
    pub const CROSS_TRADE: u8 = b'Q';
    pub const BROKEN_TRADE: u8 = b'B';
    pub const NOII: u8 = b'I';
    pub const RPII: u8 = b'N';
    pub const LULD_AUCTION_COLLAR: u8 = b'J';
    pub const MWCB_DECLINE_LEVEL: u8 = b'V';
    pub const MWCB_STATUS: u8 = b'W';
    pub const IPO_QUOTING_PERIOD: u8 = b'K';
}

/// Buy/sell side of a resting order, as encoded in the ITCH `buy/sell`
/// indicator byte (`'B'` / `'S'`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'B' => Some(Side::Buy),
            b'S' => Some(Side::Sell),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Side::Buy => b'B',
            Side::Sell => b'S',
        }
    }
}

/// Fixed-point price: the raw ITCH wire value, already scaled by 10^4.
///
/// Kept as an integer rather than `f64` so that book maps key exactly and
/// two prices read from the wire compare equal iff the underlying cents
/// (quarter-basis-points, really) are identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(pub u32);

impl Price {
    pub const SCALE: u32 = 10_000;

    pub fn from_wire(raw: u32) -> Self {
        Price(raw)
    }

    /// The value as whole-plus-fractional dollars, for display/CSV only.
    pub fn as_dollars(self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.as_dollars())
    }
}

/// An 8-byte, space-padded ASCII stock symbol as it appears on the wire,
/// trimmed for use as a map key / filename component.
pub fn trim_stock_symbol(raw: &[u8; 8]) -> String {
    let end = raw.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
    String::from_utf8_lossy(&raw[..end]).into_owned()
}
