use std::sync::Arc;

use alloy::transports::{RpcError, TransportErrorKind};
use thiserror::Error;
use tokio::time::error::Elapsed;

/// Errors returned by [`RobustProvider`](super::RobustProvider) calls.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The total call timeout elapsed, retries included.
    #[error("Operation timed out")]
    Timeout,

    /// The last provider attempted returned an RPC error.
    #[error("RPC error: {0}")]
    RpcError(Arc<RpcError<TransportErrorKind>>),
}

impl From<RpcError<TransportErrorKind>> for Error {
    fn from(err: RpcError<TransportErrorKind>) -> Self {
        Error::RpcError(Arc::new(err))
    }
}

impl From<Elapsed> for Error {
    fn from(_: Elapsed) -> Self {
        Error::Timeout
    }
}
