//! Total ordering of log entries by their position on chain.
//!
//! [`order`] compares two entries by block number, transaction index and log index, and falls back
//! to the transaction hash only when both positions are entirely zero. The result is a
//! [`LogOrder`], which distinguishes a difference found at block/transaction level from one found
//! at log-index level.

use std::{cmp::Ordering, fmt};

use alloy::{primitives::B256, rpc::types::Log};

/// Position of a log entry on chain.
///
/// Two entries with the same key describe the same event.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogKey {
    pub block_number: u64,
    pub transaction_index: u64,
    pub log_index: u64,
}

impl LogKey {
    #[must_use]
    pub const fn new(block_number: u64, transaction_index: u64, log_index: u64) -> Self {
        Self { block_number, transaction_index, log_index }
    }

    /// Returns `true` when every field is zero, i.e. the key carries no ordering information.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.block_number == 0 && self.transaction_index == 0 && self.log_index == 0
    }
}

impl fmt::Display for LogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "block {}, transaction {}, log {}",
            self.block_number, self.transaction_index, self.log_index
        )
    }
}

/// Access to the fields that order a log entry.
///
/// Implemented for alloy's RPC [`Log`]; absent fields (pending logs) read as zero.
pub trait LogPosition {
    /// The `(block, transaction, log)` position of the entry.
    fn position(&self) -> LogKey;

    /// Hash of the transaction that emitted the entry, if known.
    fn identity(&self) -> Option<B256>;
}

impl LogPosition for Log {
    fn position(&self) -> LogKey {
        LogKey {
            block_number: self.block_number.unwrap_or_default(),
            transaction_index: self.transaction_index.unwrap_or_default(),
            log_index: self.log_index.unwrap_or_default(),
        }
    }

    fn identity(&self) -> Option<B256> {
        self.transaction_hash
    }
}

/// Outcome of [`order`].
///
/// The sign tells which entry came first. A magnitude of 2 means both entries belong to the same
/// transaction and only their log index differs; it carries no extra ordering meaning.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum LogOrder {
    /// Earlier block, or earlier transaction within the same block.
    Before = -1,
    /// Same transaction, lower log index.
    BeforeInTransaction = -2,
    /// Same block, transaction and log index.
    Same = 0,
    /// Same transaction, higher log index.
    AfterInTransaction = 2,
    /// Later block, or later transaction within the same block.
    After = 1,
}

impl LogOrder {
    /// The numeric signal: `-2`, `-1`, `0`, `1` or `2`.
    #[must_use]
    pub const fn signal(self) -> i8 {
        self as i8
    }

    /// The order seen from the other operand.
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::Before => Self::After,
            Self::BeforeInTransaction => Self::AfterInTransaction,
            Self::Same => Self::Same,
            Self::AfterInTransaction => Self::BeforeInTransaction,
            Self::After => Self::Before,
        }
    }

    #[must_use]
    pub const fn is_same(self) -> bool {
        matches!(self, Self::Same)
    }

    #[must_use]
    pub const fn is_before(self) -> bool {
        matches!(self, Self::Before | Self::BeforeInTransaction)
    }

    #[must_use]
    pub const fn is_after(self) -> bool {
        matches!(self, Self::After | Self::AfterInTransaction)
    }

    const fn coarse(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => Self::Before,
            Ordering::Equal => Self::Same,
            Ordering::Greater => Self::After,
        }
    }

    const fn fine(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => Self::BeforeInTransaction,
            Ordering::Equal => Self::Same,
            Ordering::Greater => Self::AfterInTransaction,
        }
    }
}

impl From<LogOrder> for Ordering {
    fn from(order: LogOrder) -> Self {
        order.signal().cmp(&0)
    }
}

/// Compares the chain positions of `a` and `b`.
///
/// Block number is compared first, then transaction index, then log index. Entries whose
/// positions are both all-zero (typically synthetic entries) are ordered by transaction hash,
/// with an absent hash reading as zero.
///
/// Equal positions compare as [`LogOrder::Same`] even when the transaction hashes disagree;
/// detecting that inconsistency is left to the caller.
///
/// # Example
///
/// ```
/// use alloy::rpc::types::Log;
/// use event_stream::{LogOrder, order};
///
/// let a = Log { block_number: Some(98), transaction_index: Some(5), ..Default::default() };
/// let b = Log { block_number: Some(99), transaction_index: Some(3), ..Default::default() };
///
/// assert_eq!(order(&a, &b), LogOrder::Before);
/// assert_eq!(order(&b, &a).signal(), 1);
/// ```
#[must_use]
pub fn order<L: LogPosition + ?Sized>(a: &L, b: &L) -> LogOrder {
    let (pa, pb) = (a.position(), b.position());

    let coarse = pa
        .block_number
        .cmp(&pb.block_number)
        .then(pa.transaction_index.cmp(&pb.transaction_index));
    if coarse.is_ne() {
        return LogOrder::coarse(coarse);
    }

    let fine = pa.log_index.cmp(&pb.log_index);
    if fine.is_ne() {
        return LogOrder::fine(fine);
    }

    if pa.is_zero() {
        let (ha, hb) = (a.identity().unwrap_or_default(), b.identity().unwrap_or_default());
        return LogOrder::coarse(ha.cmp(&hb));
    }

    LogOrder::Same
}
