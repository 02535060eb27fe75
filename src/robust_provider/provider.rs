use std::time::Duration;

use alloy::{
    network::{Ethereum, Network},
    providers::{Provider, RootProvider},
    pubsub::Subscription,
    rpc::types::{Filter, Log},
    transports::{RpcError, TransportErrorKind},
};
use backon::{ExponentialBuilder, Retryable};
use tokio::sync::mpsc;

use crate::{
    StreamError,
    robust_provider::{
        DEFAULT_CALL_TIMEOUT, DEFAULT_MAX_RETRIES, DEFAULT_MIN_DELAY, Error,
        RobustLogSubscription,
    },
    source::LogSource,
};

/// Time and retry limits applied to every call against one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CallPolicy {
    /// Upper bound for one endpoint, retries and backoff included.
    pub(crate) call_timeout: Duration,
    pub(crate) max_retries: usize,
    pub(crate) min_delay: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            min_delay: DEFAULT_MIN_DELAY,
        }
    }
}

impl CallPolicy {
    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_max_times(self.max_retries)
            .with_min_delay(self.min_delay)
    }
}

/// Log RPCs with per-endpoint timeouts, backoff retries and failover.
///
/// Built with [`RobustProviderBuilder`](super::RobustProviderBuilder). Each call goes to the
/// primary endpoint first. While it keeps failing, the fallbacks are tried one after the other,
/// each with the same [`CallPolicy`]. The error of the last endpoint tried is returned.
#[derive(Clone, Debug)]
pub struct RobustProvider<N: Network = Ethereum> {
    pub(crate) primary: RootProvider<N>,
    pub(crate) fallbacks: Vec<RootProvider<N>>,
    pub(crate) policy: CallPolicy,
}

impl<N: Network> RobustProvider<N> {
    /// The endpoint every call starts with.
    #[must_use]
    pub fn primary(&self) -> &RootProvider<N> {
        &self.primary
    }

    /// Number of fallback endpoints.
    #[must_use]
    pub fn fallback_count(&self) -> usize {
        self.fallbacks.len()
    }

    /// `eth_getLogs` for `filter`.
    ///
    /// # Errors
    ///
    /// * [`Error::Timeout`] if the last endpoint tried did not answer within the call timeout.
    /// * [`Error::RpcError`] with the last endpoint's error otherwise.
    pub async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, Error> {
        self.call("eth_getLogs", false, |endpoint| async move { endpoint.get_logs(filter).await })
            .await
    }

    /// `eth_subscribe` to logs matching `filter`.
    ///
    /// Only opening the subscription is retried. Fallbacks without pubsub support are skipped.
    /// An open subscription is never re-established: its replacement could skip or repeat logs.
    ///
    /// # Errors
    ///
    /// Same as [`get_logs`](Self::get_logs).
    pub async fn subscribe_logs(&self, filter: &Filter) -> Result<Subscription<Log>, Error> {
        self.call("eth_subscribe", true, |endpoint| async move {
            endpoint.subscribe_logs(filter).await
        })
        .await
    }

    /// Runs `op` against the primary, then against each fallback until one succeeds.
    pub(crate) async fn call<T, F, Fut>(
        &self,
        method: &'static str,
        needs_pubsub: bool,
        op: F,
    ) -> Result<T, Error>
    where
        F: Fn(RootProvider<N>) -> Fut,
        Fut: Future<Output = Result<T, RpcError<TransportErrorKind>>>,
    {
        debug!(method = method, "Calling primary provider");
        let mut outcome = self.attempt(&self.primary, &op).await;

        for (idx, fallback) in self.fallbacks.iter().enumerate() {
            let Err(err) = &outcome else {
                break;
            };
            warn!(method = method, error = %err, "Provider failed, moving to next fallback");
            if needs_pubsub && fallback.client().pubsub_frontend().is_none() {
                debug!(fallback = idx, "Fallback has no pubsub support, skipping");
                continue;
            }
            outcome = self.attempt(fallback, &op).await;
            if outcome.is_ok() {
                info!(method = method, fallback = idx, "Fallback provider answered");
            }
        }

        if let Err(err) = &outcome {
            error!(method = method, error = %err, "Every provider failed");
        }
        outcome
    }

    /// Runs `op` against one endpoint with backoff retries, all bounded by the call timeout.
    async fn attempt<T, F, Fut>(&self, endpoint: &RootProvider<N>, op: &F) -> Result<T, Error>
    where
        F: Fn(RootProvider<N>) -> Fut,
        Fut: Future<Output = Result<T, RpcError<TransportErrorKind>>>,
    {
        let retried = (|| op(endpoint.clone()))
            .retry(self.policy.backoff())
            .sleep(tokio::time::sleep)
            .notify(|err: &RpcError<TransportErrorKind>, delay: Duration| {
                debug!(error = %err, delay_ms = delay.as_millis(), "Retrying RPC call");
            });

        Ok(tokio::time::timeout(self.policy.call_timeout, retried).await??)
    }
}

impl<N: Network> LogSource for RobustProvider<N> {
    type Subscription = RobustLogSubscription;

    async fn range_query(&self, filter: &Filter) -> Result<Vec<Log>, StreamError> {
        Ok(self.get_logs(filter).await?)
    }

    async fn subscribe(
        &self,
        filter: &Filter,
        sink: mpsc::Sender<Log>,
    ) -> Result<RobustLogSubscription, StreamError> {
        let subscription = self.subscribe_logs(filter).await?;
        Ok(RobustLogSubscription::spawn(subscription, sink))
    }
}
