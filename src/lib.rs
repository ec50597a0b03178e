//! A two-stage batch pipeline for NASDAQ TotalView-ITCH 5.0 binary market
//! data feeds.
//!
//! Stage 1 ([`grouper`]) streams a gzip-compressed ITCH feed through the
//! [`message`] decoder and groups every event by order-reference number into
//! per-ticker CSV logs ([`order_group`]). Stage 2 ([`reconstructor`]) sorts
//! and replays those logs through a live [`book::BookState`], emitting an
//! enriched CSV with the best bid/ask, spread, and depth after every row.
//!
//! Both stages are sharded by ticker across a fixed worker count
//! ([`partition`]); neither stage is real-time or low-latency — this is a
//! faithful batch replay of a recorded feed, not a live trading system.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use itch_replay::config::resolve_data_root;
//! use itch_replay::partition::ShardAssignment;
//! use itch_replay::grouper::StreamGrouper;
//!
//! let data_root = resolve_data_root(None);
//! let shard = ShardAssignment::new(1, 0);
//! let _grouper = StreamGrouper::new("062419".to_string(), shard, data_root, 1000);
//! ```

#![warn(missing_debug_implementations)]

pub mod book;
pub mod cli;
pub mod common;
pub mod config;
pub mod csvio;
pub mod error;
pub mod grouper;
pub mod layout;
pub mod message;
pub mod order_group;
pub mod partition;
pub mod reconstructor;
pub mod stream;

pub use book::{BookState, EnrichedRow, GroupedRow};
pub use common::{Price, Side};
pub use error::{BookError, DecodeError, IoError, ReplayMode};
pub use grouper::StreamGrouper;
pub use layout::DataRoot;
pub use message::Message;
pub use order_group::OrderGroup;
pub use partition::ShardAssignment;
pub use reconstructor::OrderBookReconstructor;
