use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use alloy::{
    primitives::B256,
    rpc::types::{Filter, Log},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use event_stream::{LogSource, LogSubscription, StreamError};

/// A log at `block`, first in its block, emitted by a transaction whose hash encodes `block`.
#[must_use]
pub fn log_at(block: u64) -> Log {
    Log {
        block_number: Some(block),
        transaction_index: Some(0),
        log_index: Some(0),
        transaction_hash: Some(B256::left_padding_from(&block.to_be_bytes())),
        ..Default::default()
    }
}

#[derive(Debug, Default)]
struct Record {
    queried: Vec<Filter>,
    subscribed: Vec<Filter>,
    handles: Vec<CancellationToken>,
}

/// A [`LogSource`] replaying a fixed history and a fixed live feed.
///
/// Every filter it receives is recorded, see [`queried`](Self::queried) and
/// [`subscribed`](Self::subscribed).
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    history: Vec<Log>,
    live: Vec<Log>,
    query_delay: Duration,
    query_error: Option<StreamError>,
    subscribe_error: Option<StreamError>,
    end_after_replay: bool,
    record: Arc<Mutex<Record>>,
}

impl ScriptedSource {
    /// `historic_n` historic logs at blocks `0..historic_n`, followed by `live_n` live logs whose
    /// first `overlap_n` repeat the end of the history.
    #[must_use]
    pub fn new(historic_n: u64, live_n: u64, overlap_n: u64) -> Self {
        let first_live = historic_n.saturating_sub(overlap_n);
        Self::with_logs(
            (0..historic_n).map(log_at).collect(),
            (first_live..first_live + live_n).map(log_at).collect(),
        )
    }

    #[must_use]
    pub fn with_logs(history: Vec<Log>, live: Vec<Log>) -> Self {
        Self {
            history,
            live,
            query_delay: Duration::ZERO,
            query_error: None,
            subscribe_error: None,
            end_after_replay: false,
            record: Arc::default(),
        }
    }

    /// Delays every range query by `delay`.
    #[must_use]
    pub fn query_delay(mut self, delay: Duration) -> Self {
        self.query_delay = delay;
        self
    }

    /// Fails every range query with `error`.
    #[must_use]
    pub fn failing_query(mut self, error: StreamError) -> Self {
        self.query_error = Some(error);
        self
    }

    /// Fails every subscription attempt with `error`.
    #[must_use]
    pub fn failing_subscribe(mut self, error: StreamError) -> Self {
        self.subscribe_error = Some(error);
        self
    }

    /// Closes the live feed once it has been replayed, reporting
    /// [`StreamError::SubscriptionClosed`].
    #[must_use]
    pub fn end_after_replay(mut self) -> Self {
        self.end_after_replay = true;
        self
    }

    /// Filters received by [`LogSource::range_query`], oldest first.
    #[must_use]
    pub fn queried(&self) -> Vec<Filter> {
        self.record.lock().expect("record poisoned").queried.clone()
    }

    /// Filters received by [`LogSource::subscribe`], oldest first.
    #[must_use]
    pub fn subscribed(&self) -> Vec<Filter> {
        self.record.lock().expect("record poisoned").subscribed.clone()
    }

    /// Number of subscriptions opened and not yet unsubscribed.
    #[must_use]
    pub fn active_subscriptions(&self) -> usize {
        let record = self.record.lock().expect("record poisoned");
        record.handles.iter().filter(|handle| !handle.is_cancelled()).count()
    }
}

impl LogSource for ScriptedSource {
    type Subscription = ScriptedSubscription;

    async fn range_query(&self, filter: &Filter) -> Result<Vec<Log>, StreamError> {
        self.record.lock().expect("record poisoned").queried.push(filter.clone());
        if !self.query_delay.is_zero() {
            tokio::time::sleep(self.query_delay).await;
        }
        match &self.query_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.history.clone()),
        }
    }

    async fn subscribe(
        &self,
        filter: &Filter,
        sink: mpsc::Sender<Log>,
    ) -> Result<ScriptedSubscription, StreamError> {
        self.record.lock().expect("record poisoned").subscribed.push(filter.clone());
        if let Some(err) = &self.subscribe_error {
            return Err(err.clone());
        }

        let cancel = CancellationToken::new();
        let (fault_tx, faults) = mpsc::channel(1);
        self.record.lock().expect("record poisoned").handles.push(cancel.clone());
        tokio::spawn(replay(
            self.live.clone(),
            sink,
            fault_tx,
            cancel.clone(),
            self.end_after_replay,
        ));

        Ok(ScriptedSubscription { cancel, faults })
    }
}

async fn replay(
    live: Vec<Log>,
    sink: mpsc::Sender<Log>,
    faults: mpsc::Sender<StreamError>,
    cancel: CancellationToken,
    end_after_replay: bool,
) {
    for log in live {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            sent = sink.send(log) => if sent.is_err() {
                return;
            },
        }
    }
    if end_after_replay {
        let _ = faults.try_send(StreamError::SubscriptionClosed);
        return;
    }
    cancel.cancelled().await;
}

/// Handle returned by [`ScriptedSource`].
#[derive(Debug)]
pub struct ScriptedSubscription {
    cancel: CancellationToken,
    faults: mpsc::Receiver<StreamError>,
}

impl ScriptedSubscription {
    #[must_use]
    pub fn is_unsubscribed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl LogSubscription for ScriptedSubscription {
    fn unsubscribe(&self) {
        self.cancel.cancel();
    }

    async fn err(&mut self) -> Option<StreamError> {
        self.faults.recv().await
    }
}
