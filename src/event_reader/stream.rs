use alloy::rpc::types::Log;
use tokio_stream::wrappers::ReceiverStream;

use crate::source::LogSubscription;

/// Historic logs plus the live logs that follow them, without gaps or duplicates.
///
/// Returned by [`EventReader::query_with_history`](crate::EventReader::query_with_history).
///
/// `history` is a snapshot taken once. `live` keeps yielding logs until the subscription ends:
/// call [`LogSubscription::unsubscribe`] on `subscription` to stop it, and poll
/// [`LogSubscription::err`] to learn about transport faults. `live` ends when delivery stops,
/// whatever the reason.
#[derive(Debug)]
pub struct ReconciledStream<S: LogSubscription> {
    /// Logs up to the moment of the query, in chain order.
    pub history: Vec<Log>,
    /// Logs produced after `history`, in arrival order.
    pub live: ReceiverStream<Log>,
    /// Handle of the underlying subscription.
    pub subscription: S,
}

impl<S: LogSubscription> ReconciledStream<S> {
    /// Splits into `(live, subscription, history)`.
    #[must_use]
    pub fn into_parts(self) -> (ReceiverStream<Log>, S, Vec<Log>) {
        (self.live, self.subscription, self.history)
    }
}
