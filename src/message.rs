//! ITCH 5.0 frame decoding and the typed [`Message`] enum.
//!
//! Every frame on the wire is `u16 length` followed by `length` bytes, the
//! first of which is the one-byte kind tag (`common::kind`). The remaining
//! `length - 1` bytes are the kind's fixed big-endian payload: `stock_locate`
//! (u16), `tracking_number` (u16), a 48-bit nanosecond timestamp, then the
//! kind-specific fields from the NASDAQ TotalView-ITCH 5.0 spec.
//!
//! Decoding is hand-rolled big-endian field extraction rather than a
//! `#[repr(C)]` struct cast: ITCH fields are big-endian and not uniformly
//! offset across kinds, so there is no single POD layout to transmute onto.

use crate::common::{kind, Price};
use crate::error::DecodeError;
use crate::stream::ByteStream;
use std::io::Read;

fn read_u16(b: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([b[at], b[at + 1]])
}

fn read_u32(b: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

fn read_u64(b: &[u8], at: usize) -> u64 {
    let mut a = [0u8; 8];
    a.copy_from_slice(&b[at..at + 8]);
    u64::from_be_bytes(a)
}

/// Reads a 6-byte big-endian timestamp (nanoseconds since midnight) as a u64,
/// left-padding the missing two bytes with zero.
fn read_ts48(b: &[u8], at: usize) -> u64 {
    let mut a = [0u8; 8];
    a[2..8].copy_from_slice(&b[at..at + 6]);
    u64::from_be_bytes(a)
}

fn write_ts48(out: &mut Vec<u8>, ts: u64) {
    let full = ts.to_be_bytes();
    out.extend_from_slice(&full[2..8]);
}

fn read_symbol8(b: &[u8], at: usize) -> [u8; 8] {
    let mut a = [0u8; 8];
    a.copy_from_slice(&b[at..at + 8]);
    a
}

/// Fields common to every ITCH message: the stock-locate code assigned by
/// the exchange for this session, the tracking number, and the event
/// timestamp in nanoseconds since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub stock_locate: u16,
    pub tracking_number: u16,
    pub timestamp_ns: u64,
}

macro_rules! read_header {
    ($b:expr) => {
        MessageHeader {
            stock_locate: read_u16($b, 0),
            tracking_number: read_u16($b, 2),
            timestamp_ns: read_ts48($b, 4),
        }
    };
}

macro_rules! write_header {
    ($out:expr, $h:expr) => {{
        $out.extend_from_slice(&$h.stock_locate.to_be_bytes());
        $out.extend_from_slice(&$h.tracking_number.to_be_bytes());
        write_ts48(&mut $out, $h.timestamp_ns);
    }};
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemEvent {
    pub header: MessageHeader,
    pub event_code: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDirectory {
    pub header: MessageHeader,
    pub stock: [u8; 8],
    pub market_category: u8,
    pub financial_status_indicator: u8,
    pub round_lot_size: u32,
    pub round_lots_only: u8,
    pub issue_classification: u8,
    pub issue_sub_type: [u8; 2],
    pub authenticity: u8,
    pub short_sale_threshold: u8,
    pub ipo_flag: u8,
    pub luld_reference_price_tier: u8,
    pub etp_flag: u8,
    pub etp_leverage_factor: u32,
    pub inverse_indicator: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockTradingAction {
    pub header: MessageHeader,
    pub stock: [u8; 8],
    pub trading_state: u8,
    pub reserved: u8,
    pub reason: [u8; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegShoRestriction {
    pub header: MessageHeader,
    pub stock: [u8; 8],
    pub regsho_action: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketParticipantPosition {
    pub header: MessageHeader,
    pub mpid: [u8; 4],
    pub stock: [u8; 8],
    pub primary_market_maker: u8,
    pub market_maker_mode: u8,
    pub market_participant_state: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOrder {
    pub header: MessageHeader,
    pub orn: u64,
    pub side: u8,
    pub shares: u32,
    pub stock: [u8; 8],
    pub price: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOrderMpid {
    pub header: MessageHeader,
    pub orn: u64,
    pub side: u8,
    pub shares: u32,
    pub stock: [u8; 8],
    pub price: u32,
    pub mpid: [u8; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderExecuted {
    pub header: MessageHeader,
    pub orn: u64,
    pub executed_shares: u32,
    pub match_number: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderExecutedWithPrice {
    pub header: MessageHeader,
    pub orn: u64,
    pub executed_shares: u32,
    pub match_number: u64,
    pub printable: u8,
    pub price: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderCancel {
    pub header: MessageHeader,
    pub orn: u64,
    pub cancelled_shares: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderDelete {
    pub header: MessageHeader,
    pub orn: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderReplace {
    pub header: MessageHeader,
    pub original_orn: u64,
    pub new_orn: u64,
    pub shares: u32,
    pub price: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeNonCross {
    pub header: MessageHeader,
    pub orn: u64,
    pub side: u8,
    pub shares: u32,
    pub stock: [u8; 8],
    pub price: u32,
    pub match_number: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossTrade {
    pub header: MessageHeader,
    pub shares: u64,
    pub stock: [u8; 8],
    pub price: u32,
    pub match_number: u64,
    pub cross_type: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokenTrade {
    pub header: MessageHeader,
    pub match_number: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Noii {
    pub header: MessageHeader,
    pub paired_shares: u64,
    pub imbalance_shares: u64,
    pub imbalance_direction: u8,
    pub stock: [u8; 8],
    pub far_price: u32,
    pub near_price: u32,
    pub current_reference_price: u32,
    pub cross_type: u8,
    pub price_variation_indicator: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rpii {
    pub header: MessageHeader,
    pub stock: [u8; 8],
    pub interest_flag: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MwcbDeclineLevel {
    pub header: MessageHeader,
    pub level1: u64,
    pub level2: u64,
    pub level3: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MwcbStatus {
    pub header: MessageHeader,
    pub breached_level: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpoQuotingPeriod {
    pub header: MessageHeader,
    pub stock: [u8; 8],
    pub release_time: u32,
    pub release_qualifier: u8,
    pub ipo_price: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LuldAuctionCollar {
    pub header: MessageHeader,
    pub stock: [u8; 8],
    pub reference_price: u32,
    pub upper_auction_collar: u32,
    pub lower_auction_collar: u32,
    pub auction_collar_extension: u32,
}

/// A single decoded ITCH 5.0 message. The variant names follow the NASDAQ
/// spec's section 4 message names, not the raw kind letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    SystemEvent(SystemEvent),
    StockDirectory(StockDirectory),
    StockTradingAction(StockTradingAction),
    RegShoRestriction(RegShoRestriction),
    MarketParticipantPosition(MarketParticipantPosition),
    AddOrder(AddOrder),
    AddOrderMpid(AddOrderMpid),
    OrderExecuted(OrderExecuted),
    OrderExecutedWithPrice(OrderExecutedWithPrice),
    OrderCancel(OrderCancel),
    OrderDelete(OrderDelete),
    OrderReplace(OrderReplace),
    TradeNonCross(TradeNonCross),
    CrossTrade(CrossTrade),
    BrokenTrade(BrokenTrade),
    Noii(Noii),
    Rpii(Rpii),
    MwcbDeclineLevel(MwcbDeclineLevel),
    MwcbStatus(MwcbStatus),
    IpoQuotingPeriod(IpoQuotingPeriod),
    LuldAuctionCollar(LuldAuctionCollar),
}

impl Message {
    /// The one-byte kind tag this message was decoded from.
    pub fn kind(&self) -> u8 {
        match self {
            Message::SystemEvent(_) => kind::SYSTEM_EVENT,
            Message::StockDirectory(_) => kind::STOCK_DIRECTORY,
            Message::StockTradingAction(_) => kind::STOCK_TRADING_ACTION,
            Message::RegShoRestriction(_) => kind::REG_SHO_RESTRICTION,
            Message::MarketParticipantPosition(_) => kind::MARKET_PARTICIPANT_POSITION,
            Message::AddOrder(_) => kind::ADD_ORDER,
            Message::AddOrderMpid(_) => kind::ADD_ORDER_MPID,
            Message::OrderExecuted(_) => kind::ORDER_EXECUTED,
            Message::OrderExecutedWithPrice(_) => kind::ORDER_EXECUTED_WITH_PRICE,
            Message::OrderCancel(_) => kind::ORDER_CANCEL,
            Message::OrderDelete(_) => kind::ORDER_DELETE,
            Message::OrderReplace(_) => kind::ORDER_REPLACE,
            Message::TradeNonCross(_) => kind::TRADE_NON_CROSS,
            Message::CrossTrade(_) => kind::CROSS_TRADE,
            Message::BrokenTrade(_) => kind::BROKEN_TRADE,
            Message::Noii(_) => kind::NOII,
            Message::Rpii(_) => kind::RPII,
            Message::MwcbDeclineLevel(_) => kind::MWCB_DECLINE_LEVEL,
            Message::MwcbStatus(_) => kind::MWCB_STATUS,
            Message::IpoQuotingPeriod(_) => kind::IPO_QUOTING_PERIOD,
            Message::LuldAuctionCollar(_) => kind::LULD_AUCTION_COLLAR,
        }
    }

    pub fn timestamp_ns(&self) -> u64 {
        self.header().timestamp_ns
    }

    fn header(&self) -> MessageHeader {
        match self {
            Message::SystemEvent(m) => m.header,
            Message::StockDirectory(m) => m.header,
            Message::StockTradingAction(m) => m.header,
            Message::RegShoRestriction(m) => m.header,
            Message::MarketParticipantPosition(m) => m.header,
            Message::AddOrder(m) => m.header,
            Message::AddOrderMpid(m) => m.header,
            Message::OrderExecuted(m) => m.header,
            Message::OrderExecutedWithPrice(m) => m.header,
            Message::OrderCancel(m) => m.header,
            Message::OrderDelete(m) => m.header,
            Message::OrderReplace(m) => m.header,
            Message::TradeNonCross(m) => m.header,
            Message::CrossTrade(m) => m.header,
            Message::BrokenTrade(m) => m.header,
            Message::Noii(m) => m.header,
            Message::Rpii(m) => m.header,
            Message::MwcbDeclineLevel(m) => m.header,
            Message::MwcbStatus(m) => m.header,
            Message::IpoQuotingPeriod(m) => m.header,
            Message::LuldAuctionCollar(m) => m.header,
        }
    }

    /// Decodes the `length - 1` bytes following the kind tag. `offset` and
    /// `last_reads` are only used to annotate a truncation error.
    pub fn decode(
        kind_byte: u8,
        payload: &[u8],
        offset: u64,
        last_reads: Vec<usize>,
    ) -> Result<Message, DecodeError> {
        let expected = expected_payload_len(kind_byte).ok_or(DecodeError::UnknownKind {
            kind: kind_byte,
            offset,
            last_reads: last_reads.clone(),
        })?;
        if payload.len() != expected {
            return Err(DecodeError::Truncated {
                offset,
                expected,
                got: payload.len(),
                last_reads,
            });
        }
        let b = payload;
        let header = read_header!(b);
        Ok(match kind_byte {
            kind::SYSTEM_EVENT => Message::SystemEvent(SystemEvent {
                header,
                event_code: b[10],
            }),
            kind::STOCK_DIRECTORY => Message::StockDirectory(StockDirectory {
                header,
                stock: read_symbol8(b, 10),
                market_category: b[18],
                financial_status_indicator: b[19],
                round_lot_size: read_u32(b, 20),
                round_lots_only: b[24],
                issue_classification: b[25],
                issue_sub_type: [b[26], b[27]],
                authenticity: b[28],
                short_sale_threshold: b[29],
                ipo_flag: b[30],
                luld_reference_price_tier: b[31],
                etp_flag: b[32],
                etp_leverage_factor: read_u32(b, 33),
                inverse_indicator: b[37],
            }),
            kind::STOCK_TRADING_ACTION => Message::StockTradingAction(StockTradingAction {
                header,
                stock: read_symbol8(b, 10),
                trading_state: b[18],
                reserved: b[19],
                reason: [b[20], b[21], b[22], b[23]],
            }),
            kind::REG_SHO_RESTRICTION => Message::RegShoRestriction(RegShoRestriction {
                header,
                stock: read_symbol8(b, 10),
                regsho_action: b[18],
            }),
            kind::MARKET_PARTICIPANT_POSITION => {
                Message::MarketParticipantPosition(MarketParticipantPosition {
                    header,
                    mpid: [b[10], b[11], b[12], b[13]],
                    stock: read_symbol8(b, 14),
                    primary_market_maker: b[22],
                    market_maker_mode: b[23],
                    market_participant_state: b[24],
                })
            }
            kind::ADD_ORDER => Message::AddOrder(AddOrder {
                header,
                orn: read_u64(b, 10),
                side: b[18],
                shares: read_u32(b, 19),
                stock: read_symbol8(b, 23),
                price: read_u32(b, 31),
            }),
            kind::ADD_ORDER_MPID => Message::AddOrderMpid(AddOrderMpid {
                header,
                orn: read_u64(b, 10),
                side: b[18],
                shares: read_u32(b, 19),
                stock: read_symbol8(b, 23),
                price: read_u32(b, 31),
                mpid: [b[35], b[36], b[37], b[38]],
            }),
            kind::ORDER_EXECUTED => Message::OrderExecuted(OrderExecuted {
                header,
                orn: read_u64(b, 10),
                executed_shares: read_u32(b, 18),
                match_number: read_u64(b, 22),
            }),
            kind::ORDER_EXECUTED_WITH_PRICE => {
                Message::OrderExecutedWithPrice(OrderExecutedWithPrice {
                    header,
                    orn: read_u64(b, 10),
                    executed_shares: read_u32(b, 18),
                    match_number: read_u64(b, 22),
                    printable: b[30],
                    price: read_u32(b, 31),
                })
            }
            kind::ORDER_CANCEL => Message::OrderCancel(OrderCancel {
                header,
                orn: read_u64(b, 10),
                cancelled_shares: read_u32(b, 18),
            }),
            kind::ORDER_DELETE => Message::OrderDelete(OrderDelete {
                header,
                orn: read_u64(b, 10),
            }),
            kind::ORDER_REPLACE => Message::OrderReplace(OrderReplace {
                header,
                original_orn: read_u64(b, 10),
                new_orn: read_u64(b, 18),
                shares: read_u32(b, 26),
                price: read_u32(b, 30),
            }),
            kind::TRADE_NON_CROSS => Message::TradeNonCross(TradeNonCross {
                header,
                orn: read_u64(b, 10),
                side: b[18],
                shares: read_u32(b, 19),
                stock: read_symbol8(b, 23),
                price: read_u32(b, 31),
                match_number: read_u64(b, 35),
            }),
            kind::CROSS_TRADE => Message::CrossTrade(CrossTrade {
                header,
                shares: read_u64(b, 10),
                stock: read_symbol8(b, 18),
                price: read_u32(b, 26),
                match_number: read_u64(b, 30),
                cross_type: b[38],
            }),
            kind::BROKEN_TRADE => Message::BrokenTrade(BrokenTrade {
                header,
                match_number: read_u64(b, 10),
            }),
            kind::NOII => Message::Noii(Noii {
                header,
                paired_shares: read_u64(b, 10),
                imbalance_shares: read_u64(b, 18),
                imbalance_direction: b[26],
                stock: read_symbol8(b, 27),
                far_price: read_u32(b, 35),
                near_price: read_u32(b, 39),
                current_reference_price: read_u32(b, 43),
                cross_type: b[47],
                price_variation_indicator: b[48],
            }),
            kind::RPII => Message::Rpii(Rpii {
                header,
                stock: read_symbol8(b, 10),
                interest_flag: b[18],
            }),
            kind::MWCB_DECLINE_LEVEL => Message::MwcbDeclineLevel(MwcbDeclineLevel {
                header,
                level1: read_u64(b, 10),
                level2: read_u64(b, 18),
                level3: read_u64(b, 26),
            }),
            kind::MWCB_STATUS => Message::MwcbStatus(MwcbStatus {
                header,
                breached_level: b[10],
            }),
            kind::IPO_QUOTING_PERIOD => Message::IpoQuotingPeriod(IpoQuotingPeriod {
                header,
                stock: read_symbol8(b, 10),
                release_time: read_u32(b, 18),
                release_qualifier: b[22],
                ipo_price: read_u32(b, 23),
            }),
            kind::LULD_AUCTION_COLLAR => Message::LuldAuctionCollar(LuldAuctionCollar {
                header,
                stock: read_symbol8(b, 10),
                reference_price: read_u32(b, 18),
                upper_auction_collar: read_u32(b, 22),
                lower_auction_collar: read_u32(b, 26),
                auction_collar_extension: read_u32(b, 30),
            }),
            other => {
                return Err(DecodeError::UnknownKind {
                    kind: other,
                    offset,
                    last_reads,
                })
            }
        })
    }

    /// Re-encodes this message as a full frame: `u16` length prefix, the
    /// kind byte, then the payload — byte-identical to what it was decoded
    /// from.
    pub fn encode_frame(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(48);
        payload.push(self.kind());
        match self {
            Message::SystemEvent(m) => {
                write_header!(payload, m.header);
                payload.push(m.event_code);
            }
            Message::StockDirectory(m) => {
                write_header!(payload, m.header);
                payload.extend_from_slice(&m.stock);
                payload.push(m.market_category);
                payload.push(m.financial_status_indicator);
                payload.extend_from_slice(&m.round_lot_size.to_be_bytes());
                payload.push(m.round_lots_only);
                payload.push(m.issue_classification);
                payload.extend_from_slice(&m.issue_sub_type);
                payload.push(m.authenticity);
                payload.push(m.short_sale_threshold);
                payload.push(m.ipo_flag);
                payload.push(m.luld_reference_price_tier);
                payload.push(m.etp_flag);
                payload.extend_from_slice(&m.etp_leverage_factor.to_be_bytes());
                payload.push(m.inverse_indicator);
            }
            Message::StockTradingAction(m) => {
                write_header!(payload, m.header);
                payload.extend_from_slice(&m.stock);
                payload.push(m.trading_state);
                payload.push(m.reserved);
                payload.extend_from_slice(&m.reason);
            }
            Message::RegShoRestriction(m) => {
                write_header!(payload, m.header);
                payload.extend_from_slice(&m.stock);
                payload.push(m.regsho_action);
            }
            Message::MarketParticipantPosition(m) => {
                write_header!(payload, m.header);
                payload.extend_from_slice(&m.mpid);
                payload.extend_from_slice(&m.stock);
                payload.push(m.primary_market_maker);
                payload.push(m.market_maker_mode);
                payload.push(m.market_participant_state);
            }
            Message::AddOrder(m) => {
                write_header!(payload, m.header);
                payload.extend_from_slice(&m.orn.to_be_bytes());
                payload.push(m.side);
                payload.extend_from_slice(&m.shares.to_be_bytes());
                payload.extend_from_slice(&m.stock);
                payload.extend_from_slice(&m.price.to_be_bytes());
            }
            Message::AddOrderMpid(m) => {
                write_header!(payload, m.header);
                payload.extend_from_slice(&m.orn.to_be_bytes());
                payload.push(m.side);
                payload.extend_from_slice(&m.shares.to_be_bytes());
                payload.extend_from_slice(&m.stock);
                payload.extend_from_slice(&m.price.to_be_bytes());
                payload.extend_from_slice(&m.mpid);
            }
            Message::OrderExecuted(m) => {
                write_header!(payload, m.header);
                payload.extend_from_slice(&m.orn.to_be_bytes());
                payload.extend_from_slice(&m.executed_shares.to_be_bytes());
                payload.extend_from_slice(&m.match_number.to_be_bytes());
            }
            Message::OrderExecutedWithPrice(m) => {
                write_header!(payload, m.header);
                payload.extend_from_slice(&m.orn.to_be_bytes());
                payload.extend_from_slice(&m.executed_shares.to_be_bytes());
                payload.extend_from_slice(&m.match_number.to_be_bytes());
                payload.push(m.printable);
                payload.extend_from_slice(&m.price.to_be_bytes());
            }
            Message::OrderCancel(m) => {
                write_header!(payload, m.header);
                payload.extend_from_slice(&m.orn.to_be_bytes());
                payload.extend_from_slice(&m.cancelled_shares.to_be_bytes());
            }
            Message::OrderDelete(m) => {
                write_header!(payload, m.header);
                payload.extend_from_slice(&m.orn.to_be_bytes());
            }
            Message::OrderReplace(m) => {
                write_header!(payload, m.header);
                payload.extend_from_slice(&m.original_orn.to_be_bytes());
                payload.extend_from_slice(&m.new_orn.to_be_bytes());
                payload.extend_from_slice(&m.shares.to_be_bytes());
                payload.extend_from_slice(&m.price.to_be_bytes());
            }
            Message::TradeNonCross(m) => {
                write_header!(payload, m.header);
                payload.extend_from_slice(&m.orn.to_be_bytes());
                payload.push(m.side);
                payload.extend_from_slice(&m.shares.to_be_bytes());
                payload.extend_from_slice(&m.stock);
                payload.extend_from_slice(&m.price.to_be_bytes());
                payload.extend_from_slice(&m.match_number.to_be_bytes());
            }
            Message::CrossTrade(m) => {
                write_header!(payload, m.header);
                payload.extend_from_slice(&m.shares.to_be_bytes());
                payload.extend_from_slice(&m.stock);
                payload.extend_from_slice(&m.price.to_be_bytes());
                payload.extend_from_slice(&m.match_number.to_be_bytes());
                payload.push(m.cross_type);
            }
            Message::BrokenTrade(m) => {
                write_header!(payload, m.header);
                payload.extend_from_slice(&m.match_number.to_be_bytes());
            }
            Message::Noii(m) => {
                write_header!(payload, m.header);
                payload.extend_from_slice(&m.paired_shares.to_be_bytes());
                payload.extend_from_slice(&m.imbalance_shares.to_be_bytes());
                payload.push(m.imbalance_direction);
                payload.extend_from_slice(&m.stock);
                payload.extend_from_slice(&m.far_price.to_be_bytes());
                payload.extend_from_slice(&m.near_price.to_be_bytes());
                payload.extend_from_slice(&m.current_reference_price.to_be_bytes());
                payload.push(m.cross_type);
                payload.push(m.price_variation_indicator);
            }
            Message::Rpii(m) => {
                write_header!(payload, m.header);
                payload.extend_from_slice(&m.stock);
                payload.push(m.interest_flag);
            }
            Message::MwcbDeclineLevel(m) => {
                write_header!(payload, m.header);
                payload.extend_from_slice(&m.level1.to_be_bytes());
                payload.extend_from_slice(&m.level2.to_be_bytes());
                payload.extend_from_slice(&m.level3.to_be_bytes());
            }
            Message::MwcbStatus(m) => {
                write_header!(payload, m.header);
                payload.push(m.breached_level);
            }
            Message::IpoQuotingPeriod(m) => {
                write_header!(payload, m.header);
                payload.extend_from_slice(&m.stock);
                payload.extend_from_slice(&m.release_time.to_be_bytes());
                payload.push(m.release_qualifier);
                payload.extend_from_slice(&m.ipo_price.to_be_bytes());
            }
            Message::LuldAuctionCollar(m) => {
                write_header!(payload, m.header);
                payload.extend_from_slice(&m.stock);
                payload.extend_from_slice(&m.reference_price.to_be_bytes());
                payload.extend_from_slice(&m.upper_auction_collar.to_be_bytes());
                payload.extend_from_slice(&m.lower_auction_collar.to_be_bytes());
                payload.extend_from_slice(&m.auction_collar_extension.to_be_bytes());
            }
        }
        let mut frame = Vec::with_capacity(2 + payload.len());
        frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        frame.extend_from_slice(&payload);
        frame
    }
}

/// The fixed payload length (excluding the kind byte itself) for each known
/// kind, or `None` for an unrecognized tag.
fn expected_payload_len(kind_byte: u8) -> Option<usize> {
    Some(match kind_byte {
        kind::SYSTEM_EVENT => 11,
        kind::STOCK_DIRECTORY => 38,
        kind::STOCK_TRADING_ACTION => 24,
        kind::REG_SHO_RESTRICTION => 19,
        kind::MARKET_PARTICIPANT_POSITION => 25,
        kind::ADD_ORDER => 35,
        kind::ADD_ORDER_MPID => 39,
        kind::ORDER_EXECUTED => 30,
        kind::ORDER_EXECUTED_WITH_PRICE => 35,
        kind::ORDER_CANCEL => 22,
        kind::ORDER_DELETE => 18,
        kind::ORDER_REPLACE => 34,
        kind::TRADE_NON_CROSS => 43,
        kind::CROSS_TRADE => 39,
        kind::BROKEN_TRADE => 18,
        kind::NOII => 49,
        kind::RPII => 19,
        kind::MWCB_DECLINE_LEVEL => 34,
        kind::MWCB_STATUS => 11,
        kind::IPO_QUOTING_PERIOD => 27,
        kind::LULD_AUCTION_COLLAR => 34,
        _ => return None,
    })
}

/// Pulls the next frame off `stream` and decodes it. Returns `Ok(None)` only
/// when the stream is cleanly exhausted at a frame boundary; a truncated
/// frame mid-read is a [`DecodeError`].
pub fn next_message<R: Read>(stream: &mut ByteStream<R>) -> Result<Option<Message>, DecodeError> {
    if stream.is_exhausted()? {
        return Ok(None);
    }
    let offset = stream.offset();
    let len_bytes = stream.read_exact(2)?;
    let length = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;
    if length == 0 {
        return Err(DecodeError::Truncated {
            offset,
            expected: 1,
            got: 0,
            last_reads: stream.last_reads(),
        });
    }
    let body = stream.read_exact(length)?;
    let kind_byte = body[0];
    Message::decode(kind_byte, &body[1..], stream.offset(), stream.last_reads()).map(Some)
}

/// Extracts the `Price` (already ×10⁴ on the wire) from a raw u32.
pub fn price_from_wire(raw: u32) -> Price {
    Price::from_wire(raw)
}
