//! Capabilities required from the node that serves logs.
//!
//! The reconciler never talks to a transport directly. It needs two operations, a one-shot range
//! query and a subscription, described by [`LogSource`], and a handle to stop a subscription,
//! described by [`LogSubscription`]. [`RobustProvider`](crate::robust_provider::RobustProvider)
//! implements both on top of alloy; tests substitute scripted sources.

use alloy::rpc::types::{Filter, Log};
use tokio::sync::mpsc;

use crate::StreamError;

/// A node (or stand-in) that can query and stream logs matching a [`Filter`].
pub trait LogSource: Send + Sync {
    /// Handle returned by [`subscribe`](LogSource::subscribe).
    type Subscription: LogSubscription;

    /// Returns every log matching `filter`, in chain order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query cannot be served.
    fn range_query(
        &self,
        filter: &Filter,
    ) -> impl Future<Output = Result<Vec<Log>, StreamError>> + Send;

    /// Starts delivering logs matching `filter` into `sink`, in production order.
    ///
    /// Implementations must drop `sink` once delivery stops, whether because of
    /// [`LogSubscription::unsubscribe`], a transport fault or the upstream subscription ending.
    /// Dropping it is how downstream consumers learn the feed is over.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription cannot be opened.
    fn subscribe(
        &self,
        filter: &Filter,
        sink: mpsc::Sender<Log>,
    ) -> impl Future<Output = Result<Self::Subscription, StreamError>> + Send;
}

/// Handle of a running log subscription.
pub trait LogSubscription: Send + 'static {
    /// Stops delivery. Calling it more than once has no further effect.
    fn unsubscribe(&self);

    /// Waits for the next transport fault reported by the subscription.
    ///
    /// Resolves to `None` once the subscription has finished and no more faults can occur.
    fn err(&mut self) -> impl Future<Output = Option<StreamError>> + Send;
}
