//! Event-Stream turns a log filter into one gap-free, duplicate-free sequence of EVM logs: the
//! history up to now, followed by a live stream of what comes next.
//!
//! The main entry point is [`EventReader`], built via [`EventReaderBuilder`] on top of any
//! [`LogSource`], typically a [`robust_provider::RobustProvider`].
//!
//! # The boundary problem
//!
//! Reading history (`eth_getLogs`) and subscribing to new logs (`eth_subscribe`) are two separate
//! requests. Query first and a log produced in between is lost; subscribe first and a log produced
//! in between shows up twice. [`EventReader::query_with_history`] subscribes first, then queries,
//! then matches the first live logs against the end of the history by position and transaction
//! hash. Matching duplicates are dropped. A live feed that does not line up with the history is
//! reported as [`StreamError::NoOverlap`] instead of being delivered with a hole in it.
//!
//! # Ordering
//!
//! [`order`] is the total order used for matching: block number, then transaction index, then log
//! index, with the transaction hash as a last resort for entries without any position.
//!
//! # Backpressure
//!
//! The live stream is buffered ([`DEFAULT_STREAM_BUFFER_CAPACITY`] logs by default). A consumer
//! that stops draining it stalls the relay, and then the subscription itself. Logs the node drops
//! in that situation are not recovered; the subscription handle reports
//! [`StreamError::Lagged`] when the transport notices.
//!
//! # Lifetime
//!
//! The live stream lives as long as the subscription. Call [`LogSubscription::unsubscribe`] to end
//! it; transport faults surface through [`LogSubscription::err`].

#[macro_use]
mod logging;

pub mod robust_provider;

mod error;
mod event_reader;
mod order;
mod source;
mod types;

pub use error::StreamError;
pub use event_reader::{
    DEFAULT_OVERLAP_TIMEOUT, DEFAULT_STREAM_BUFFER_CAPACITY, EventReader, EventReaderBuilder,
    ReconciledStream,
};
pub use order::{LogKey, LogOrder, LogPosition, order};
pub use source::{LogSource, LogSubscription};
