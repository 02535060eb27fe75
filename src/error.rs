use std::{mem::discriminant, sync::Arc};

use alloy::transports::{RpcError, TransportErrorKind};
use thiserror::Error;

use crate::{order::LogKey, robust_provider::Error as RobustProviderError};

/// Errors emitted while reconciling historic and live logs.
///
/// Setup failures are returned from [`EventReader::query_with_history`][query]. Faults occurring
/// after setup are reported through [`LogSubscription::err`][err] only.
///
/// [query]: crate::EventReader::query_with_history
/// [err]: crate::LogSubscription::err
#[derive(Error, Debug, Clone)]
pub enum StreamError {
    /// The underlying RPC transport returned an error.
    #[error("RPC error: {0}")]
    RpcError(Arc<RpcError<TransportErrorKind>>),

    /// A timeout elapsed while waiting for an RPC response.
    #[error("Operation timed out")]
    Timeout,

    /// The caller cancelled the request before setup completed.
    #[error("Operation cancelled")]
    Cancelled,

    /// The live feed does not continue the historic batch.
    ///
    /// Either the first live log matches no log at the end of the history, or a later live log
    /// differs from the historic log it should duplicate. Delivering the feeds anyway could skip
    /// or reorder events.
    #[error("Live logs do not overlap with history at {0}")]
    NoOverlap(LogKey),

    /// Two logs at the same position were emitted by different transactions.
    #[error("Conflicting transaction hashes for the log at {0}")]
    ConflictingLog(LogKey),

    /// The upstream subscription ended (for example, the WebSocket connection closed).
    #[error("Subscription closed")]
    SubscriptionClosed,

    /// The upstream subscription skipped logs because its buffer overflowed.
    ///
    /// The contained value is the number of skipped logs reported by the underlying channel.
    #[error("Subscription lagged by {0} logs")]
    Lagged(u64),

    /// The configured stream buffer capacity is invalid (must be greater than zero).
    #[error("Stream buffer capacity must be greater than 0")]
    InvalidBufferCapacity,
}

impl StreamError {
    /// Returns `true` when both errors are of the same kind, ignoring their payloads.
    #[must_use]
    pub fn same_kind(&self, other: &StreamError) -> bool {
        discriminant(self) == discriminant(other)
    }
}

impl From<RobustProviderError> for StreamError {
    fn from(error: RobustProviderError) -> StreamError {
        match error {
            RobustProviderError::Timeout => StreamError::Timeout,
            RobustProviderError::RpcError(err) => StreamError::RpcError(err),
        }
    }
}

impl From<RpcError<TransportErrorKind>> for StreamError {
    fn from(error: RpcError<TransportErrorKind>) -> Self {
        StreamError::RpcError(Arc::new(error))
    }
}
