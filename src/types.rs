use std::fmt::Debug;

use tokio::sync::mpsc;

/// Sending half of a downstream channel that may have lost its receiver.
pub(crate) trait TryStream<T> {
    /// Sends `item`, waiting for capacity.
    ///
    /// Returns `false` if the receiver is gone and streaming should stop.
    async fn try_stream(&self, item: T) -> bool;
}

impl<T: Debug> TryStream<T> for mpsc::Sender<T> {
    async fn try_stream(&self, item: T) -> bool {
        trace!(item = ?item, "Forwarding live log");
        if let Err(err) = self.send(item).await {
            warn!(error = %err, "Downstream channel closed, stopping stream");
            return false;
        }
        true
    }
}
