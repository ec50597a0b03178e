//! Error taxonomy for the decode, grouping, and reconstruction stages.

use std::io;
use thiserror::Error;

/// Errors raised while pulling bytes off a [`crate::stream::ByteStream`] or
/// splitting them into [`crate::message::Message`] values.
///
/// Both variants carry the absolute byte offset at which the failure was
/// detected plus the sizes of the last three reads, so a bad feed file can be
/// diagnosed without re-running the whole decode.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unknown message kind {kind:#04x} at offset {offset} (last reads: {last_reads:?})")]
    UnknownKind {
        kind: u8,
        offset: u64,
        last_reads: Vec<usize>,
    },

    #[error("truncated message at offset {offset}: expected {expected} bytes, got {got} (last reads: {last_reads:?})")]
    Truncated {
        offset: u64,
        expected: usize,
        got: usize,
        last_reads: Vec<usize>,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Violations of book invariants discovered during Stage 2 replay.
///
/// In `Pedantic` mode these abort the reconstruction of the current ticker;
/// in `Permissive` mode the reconstructor clamps and logs a warning instead
/// (see [`crate::error::ReplayMode`]).
#[derive(Debug, Error)]
pub enum BookError {
    #[error("no resting order at price {price} on {side:?} side for order reference {orn}")]
    MissingPrice {
        orn: i64,
        side: crate::common::Side,
        price: crate::common::Price,
    },

    #[error("removal of {shares} shares from {orn} would take depth negative (had {available})")]
    NegativeDepth {
        orn: i64,
        shares: u32,
        available: u64,
    },
}

/// How the reconstructor reacts to a [`BookError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayMode {
    /// Abort reconstruction of the current ticker on the first inconsistency.
    Pedantic,
    /// Clamp the offending quantity to zero, log a warning, and continue.
    #[default]
    Permissive,
}

/// I/O failures from reading grouped CSVs or writing enriched/processed
/// output. The glue layer retries a write once before propagating.
#[derive(Debug, Error)]
#[error("I/O error on {path}: {source}")]
pub struct IoError {
    pub path: String,
    #[source]
    pub source: io::Error,
}

impl IoError {
    pub fn new(path: impl Into<String>, source: io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}
