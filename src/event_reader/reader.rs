use std::time::Duration;

use alloy::{
    eips::BlockNumberOrTag,
    network::Network,
    primitives::B256,
    rpc::types::{Filter, Log},
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use super::{overlap::count_overlap, stream::ReconciledStream};
use crate::{
    StreamError,
    robust_provider::{IntoRobustProvider, RobustProvider},
    source::{LogSource, LogSubscription},
    types::TryStream,
};

/// Default capacity of the live intake and of the outward live stream.
pub const DEFAULT_STREAM_BUFFER_CAPACITY: usize = 60;

/// Default time to wait for each live log while looking for the historic/live overlap.
///
/// Overlapping logs were produced before the historic query ran, so a node delivers them
/// promptly. A feed that stays silent this long is assumed to have no overlap.
pub const DEFAULT_OVERLAP_TIMEOUT: Duration = Duration::from_millis(200);

/// Builder for an [`EventReader`].
#[derive(Debug, Clone)]
pub struct EventReaderBuilder {
    pub(crate) buffer_capacity: usize,
    pub(crate) overlap_timeout: Duration,
}

impl Default for EventReaderBuilder {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_STREAM_BUFFER_CAPACITY,
            overlap_timeout: DEFAULT_OVERLAP_TIMEOUT,
        }
    }
}

impl EventReaderBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of live logs buffered before the subscription is backpressured.
    ///
    /// Applies both to the intake fed by the subscription and to the stream handed to the caller.
    /// A consumer that does not keep up eventually stalls the subscription, which may cause the
    /// node to drop it.
    ///
    /// Default is [`DEFAULT_STREAM_BUFFER_CAPACITY`]. Must be greater than zero.
    #[must_use]
    pub fn buffer_capacity(mut self, buffer_capacity: usize) -> Self {
        self.buffer_capacity = buffer_capacity;
        self
    }

    /// Sets how long to wait for each live log while matching the live feed against the end of
    /// the history.
    ///
    /// Every call with a non-empty history waits at least this long when the live feed is quiet.
    ///
    /// Default is [`DEFAULT_OVERLAP_TIMEOUT`].
    #[must_use]
    pub fn overlap_timeout(mut self, overlap_timeout: Duration) -> Self {
        self.overlap_timeout = overlap_timeout;
        self
    }

    /// Builds a reader on top of any [`LogSource`].
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidBufferCapacity`] if the buffer capacity is zero.
    pub fn build<S: LogSource>(self, source: S) -> Result<EventReader<S>, StreamError> {
        if self.buffer_capacity == 0 {
            return Err(StreamError::InvalidBufferCapacity);
        }
        debug!(
            buffer_capacity = self.buffer_capacity,
            overlap_timeout_ms = self.overlap_timeout.as_millis(),
            "Building EventReader"
        );
        Ok(EventReader { source, config: self })
    }

    /// Connects to a node through a [`RobustProvider`].
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The provider connection fails
    /// * The buffer capacity is zero
    pub async fn connect<N: Network>(
        self,
        provider: impl IntoRobustProvider<N>,
    ) -> Result<EventReader<RobustProvider<N>>, StreamError> {
        if self.buffer_capacity == 0 {
            return Err(StreamError::InvalidBufferCapacity);
        }
        let provider = provider.into_robust_provider().await?;
        self.build(provider)
    }
}

/// Reads logs matching a filter as one gap-free, duplicate-free sequence: the history up to now,
/// followed by a live stream.
///
/// # Example
///
/// ```no_run
/// # use alloy::{network::Ethereum, rpc::types::Filter};
/// # use event_stream::{EventReaderBuilder, LogSubscription};
/// # use tokio_stream::StreamExt;
/// # use tokio_util::sync::CancellationToken;
/// #
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let contract_address = alloy::primitives::address!("0xd8dA6BF26964af9d7eed9e03e53415d37aa96045");
/// let reader = EventReaderBuilder::new().connect::<Ethereum>("ws://localhost:8545").await?;
///
/// let filter = Filter::new().address(contract_address);
/// let stream = reader.query_with_history(&filter, &CancellationToken::new()).await?;
///
/// println!("{} historic logs", stream.history.len());
///
/// let mut live = stream.live;
/// while let Some(log) = live.next().await {
///     println!("live log in block {:?}", log.block_number);
/// }
/// stream.subscription.unsubscribe();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct EventReader<S: LogSource> {
    source: S,
    config: EventReaderBuilder,
}

impl<S: LogSource> EventReader<S> {
    /// The underlying log source.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns the logs matching `filter` so far, plus a stream of the ones that follow.
    ///
    /// # How it works
    ///
    /// 1. Opens a live subscription with `filter` as given. Opening it first guarantees that the
    ///    live feed starts no later than the history ends.
    /// 2. Queries the history with the same filter, its upper bound opened up to `latest`.
    /// 3. Matches the first live logs against the end of the history, waiting at most
    ///    [`overlap_timeout`](EventReaderBuilder::overlap_timeout) for each, and drops the
    ///    duplicates.
    /// 4. Relays every remaining live log into the returned stream from a background task, for as
    ///    long as the subscription lives.
    ///
    /// Duplicates are only removed at the boundary. A log that the node delivers twice later on
    /// is passed through twice.
    ///
    /// # Errors
    ///
    /// * [`StreamError::Cancelled`] if `cancel` fires before setup completes.
    /// * [`StreamError::NoOverlap`] if the live feed does not continue the history.
    /// * [`StreamError::ConflictingLog`] if the feeds disagree on the transaction of a log.
    /// * Any error of the source's subscription or range query.
    ///
    /// The subscription is closed again whenever an error is returned after it was opened.
    pub async fn query_with_history(
        &self,
        filter: &Filter,
        cancel: &CancellationToken,
    ) -> Result<ReconciledStream<S::Subscription>, StreamError> {
        if cancel.is_cancelled() {
            return Err(StreamError::Cancelled);
        }

        let (intake_tx, mut intake) = mpsc::channel(self.config.buffer_capacity);
        let subscription = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(StreamError::Cancelled),
            subscription = self.source.subscribe(filter, intake_tx) => subscription?,
        };

        let history = match self.reconcile(filter, &mut intake, cancel).await {
            Ok(history) => history,
            Err(err) => {
                warn!(error = %err, "Reconciling history failed, closing subscription");
                subscription.unsubscribe();
                return Err(err);
            }
        };

        let (live_tx, live) = mpsc::channel(self.config.buffer_capacity);
        tokio::spawn(relay(intake, live_tx));

        Ok(ReconciledStream { history, live: ReceiverStream::new(live), subscription })
    }

    /// Same as [`query_with_history`](Self::query_with_history) for every log whose first topic is
    /// `signature`, from any contract.
    ///
    /// For a `sol!` event `E`, pass `E::SIGNATURE_HASH`.
    ///
    /// # Errors
    ///
    /// See [`query_with_history`](Self::query_with_history).
    pub async fn events_with_history(
        &self,
        signature: B256,
        cancel: &CancellationToken,
    ) -> Result<ReconciledStream<S::Subscription>, StreamError> {
        let filter = Filter::new().event_signature(signature);
        self.query_with_history(&filter, cancel).await
    }

    /// Runs the historic query and drains the duplicated live logs from `intake`.
    async fn reconcile(
        &self,
        filter: &Filter,
        intake: &mut mpsc::Receiver<Log>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Log>, StreamError> {
        let history_filter = filter.clone().to_block(BlockNumberOrTag::Latest);
        let history = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(StreamError::Cancelled),
            history = self.source.range_query(&history_filter) => history?,
        };

        let overlap = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(StreamError::Cancelled),
            overlap = count_overlap(&history, intake, self.config.overlap_timeout) => overlap?,
        };

        info!(history_len = history.len(), overlap = overlap, "History reconciled with live feed");
        Ok(history)
    }
}

/// Moves live logs from the subscription's intake to the caller's stream.
///
/// Ends, closing the caller's stream, once the intake closes. Ends early, closing the intake,
/// once the caller drops the stream.
async fn relay(mut intake: mpsc::Receiver<Log>, live: mpsc::Sender<Log>) {
    loop {
        let log = tokio::select! {
            biased;
            log = intake.recv() => log,
            () = live.closed() => {
                debug!("Live stream dropped by the consumer");
                break;
            }
        };
        let Some(log) = log else {
            debug!("Live intake closed, ending live stream");
            break;
        };
        if !live.try_stream(log).await {
            break;
        }
    }
}
