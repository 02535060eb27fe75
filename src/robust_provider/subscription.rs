use alloy::{pubsub::Subscription, rpc::types::Log};
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tokio_util::sync::CancellationToken;

use crate::{StreamError, source::LogSubscription};

/// Capacity of the fault channel of a [`RobustLogSubscription`].
const FAULT_BUFFER_CAPACITY: usize = 8;

/// Handle of a log subscription opened through a
/// [`RobustProvider`](crate::robust_provider::RobustProvider).
///
/// A background task moves logs from the alloy subscription into the sink given to
/// [`LogSource::subscribe`](crate::LogSource::subscribe). The task stops when
/// [`unsubscribe`](LogSubscription::unsubscribe) is called, when the sink's receiver is dropped or
/// when the upstream subscription closes, and drops the sink on the way out.
#[derive(Debug)]
pub struct RobustLogSubscription {
    cancel: CancellationToken,
    faults: mpsc::Receiver<StreamError>,
}

impl RobustLogSubscription {
    pub(crate) fn spawn(subscription: Subscription<Log>, sink: mpsc::Sender<Log>) -> Self {
        let cancel = CancellationToken::new();
        let (fault_tx, faults) = mpsc::channel(FAULT_BUFFER_CAPACITY);

        tokio::spawn(pump(subscription, sink, fault_tx, cancel.clone()));

        Self { cancel, faults }
    }
}

impl LogSubscription for RobustLogSubscription {
    fn unsubscribe(&self) {
        if !self.cancel.is_cancelled() {
            debug!("Unsubscribing from logs");
            self.cancel.cancel();
        }
    }

    async fn err(&mut self) -> Option<StreamError> {
        self.faults.recv().await
    }
}

async fn pump(
    mut subscription: Subscription<Log>,
    sink: mpsc::Sender<Log>,
    faults: mpsc::Sender<StreamError>,
    cancel: CancellationToken,
) {
    loop {
        let received = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            received = subscription.recv() => received,
        };

        match received {
            Ok(log) => {
                trace!(block_number = log.block_number, log_index = log.log_index, "Received log");
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    sent = sink.send(log) => if sent.is_err() {
                        debug!("Log receiver dropped, stopping subscription");
                        break;
                    },
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped = skipped, "Log subscription lagged");
                report(&faults, StreamError::Lagged(skipped));
            }
            Err(RecvError::Closed) => {
                error!("Log subscription closed by the provider");
                report(&faults, StreamError::SubscriptionClosed);
                break;
            }
        }
    }
}

fn report(faults: &mpsc::Sender<StreamError>, fault: StreamError) {
    if let Err(err) = faults.try_send(fault) {
        warn!(error = %err, "Fault channel full or closed, dropping fault");
    }
}
