use std::time::Duration;

use alloy::rpc::types::Log;
use tokio::{sync::mpsc, time::timeout};

use crate::{
    StreamError,
    order::{LogPosition, order},
};

/// Counts the live logs that duplicate the tail of `history`, consuming them from `intake`.
///
/// The subscription is opened before the historic query runs, so the first live logs may already
/// be part of `history`. The first live log must either match one of the historic logs, searched
/// backward from the end, or not show up at all within `wait`. Every following historic log is
/// then paired with the next live log. The walk stops at the end of `history`, when the intake
/// closes, or when no live log arrives within `wait`.
///
/// Only the matched logs are taken from `intake`; everything after them stays queued.
///
/// # Errors
///
/// * [`StreamError::NoOverlap`] if a live log does not match the historic log it should
///   duplicate, including a first live log that comes after the whole history.
/// * [`StreamError::ConflictingLog`] if a matched pair was emitted by different transactions.
pub(crate) async fn count_overlap(
    history: &[Log],
    intake: &mut mpsc::Receiver<Log>,
    wait: Duration,
) -> Result<usize, StreamError> {
    if history.is_empty() {
        return Ok(0);
    }

    let Some(first) = next_within(intake, wait).await else {
        debug!(history_len = history.len(), "No live logs within the overlap window");
        return Ok(0);
    };

    let start = locate(history, &first).ok_or(StreamError::NoOverlap(first.position()))?;
    ensure_same_identity(&history[start], &first)?;
    trace!(start = start, history_len = history.len(), "Live feed starts inside history");

    let mut overlap = 1;
    for expected in &history[start + 1..] {
        let Some(live) = next_within(intake, wait).await else {
            debug!(overlap = overlap, "Live feed paused inside the overlap, stopping early");
            break;
        };
        if !order(expected, &live).is_same() {
            error!(
                expected = %expected.position(),
                received = %live.position(),
                "Live log out of step with history"
            );
            return Err(StreamError::NoOverlap(live.position()));
        }
        ensure_same_identity(expected, &live)?;
        overlap += 1;
    }

    Ok(overlap)
}

/// Index of the historic log that is the same event as `live`, searching from the end.
fn locate(history: &[Log], live: &Log) -> Option<usize> {
    for (idx, log) in history.iter().enumerate().rev() {
        let ord = order(log, live);
        if ord.is_same() {
            return Some(idx);
        }
        if ord.is_before() {
            // every remaining historic log is older still
            break;
        }
    }
    None
}

fn ensure_same_identity(historic: &Log, live: &Log) -> Result<(), StreamError> {
    match (historic.identity(), live.identity()) {
        (Some(a), Some(b)) if a != b => {
            error!(position = %live.position(), "Same log position, different transactions");
            Err(StreamError::ConflictingLog(live.position()))
        }
        _ => Ok(()),
    }
}

async fn next_within(intake: &mut mpsc::Receiver<Log>, wait: Duration) -> Option<Log> {
    timeout(wait, intake.recv()).await.ok().flatten()
}

#[cfg(test)]
mod tests {
    use alloy::primitives::B256;

    use super::*;

    const WAIT: Duration = Duration::from_millis(50);

    fn log(block: u64) -> Log {
        Log { block_number: Some(block), ..Default::default() }
    }

    fn logs(blocks: impl IntoIterator<Item = u64>) -> Vec<Log> {
        blocks.into_iter().map(log).collect()
    }

    fn intake_with(live: Vec<Log>) -> (mpsc::Sender<Log>, mpsc::Receiver<Log>) {
        let (tx, rx) = mpsc::channel(64);
        for log in live {
            tx.try_send(log).unwrap();
        }
        (tx, rx)
    }

    #[tokio::test]
    async fn empty_history_takes_nothing() {
        let (_tx, mut rx) = intake_with(logs([0, 1]));

        let overlap = count_overlap(&[], &mut rx, WAIT).await.unwrap();

        assert_eq!(overlap, 0);
        assert_eq!(rx.len(), 2);
    }

    #[tokio::test]
    async fn silent_feed_means_no_overlap() {
        let (_tx, mut rx) = intake_with(vec![]);

        let overlap = count_overlap(&logs(0..99), &mut rx, WAIT).await.unwrap();

        assert_eq!(overlap, 0);
    }

    #[tokio::test]
    async fn closed_feed_means_no_overlap() {
        let (tx, mut rx) = intake_with(vec![]);
        drop(tx);

        let overlap = count_overlap(&logs(0..3), &mut rx, Duration::from_secs(5)).await.unwrap();

        assert_eq!(overlap, 0);
    }

    #[tokio::test]
    async fn single_duplicate_is_consumed() {
        let (_tx, mut rx) = intake_with(logs([0]));

        let overlap = count_overlap(&logs([0]), &mut rx, WAIT).await.unwrap();

        assert_eq!(overlap, 1);
        assert!(rx.is_empty());
    }

    #[tokio::test]
    async fn duplicated_tail_is_consumed_and_new_logs_stay_queued() {
        let (_tx, mut rx) = intake_with(logs(7..12));

        let overlap = count_overlap(&logs(0..10), &mut rx, WAIT).await.unwrap();

        assert_eq!(overlap, 3);
        assert_eq!(rx.recv().await.unwrap().block_number, Some(10));
        assert_eq!(rx.recv().await.unwrap().block_number, Some(11));
    }

    #[tokio::test]
    async fn stops_early_when_feed_pauses() {
        let (_tx, mut rx) = intake_with(logs([5, 6]));

        let overlap = count_overlap(&logs(0..10), &mut rx, WAIT).await.unwrap();

        assert_eq!(overlap, 2);
    }

    #[tokio::test]
    async fn adjacent_but_new_log_is_rejected() {
        let (_tx, mut rx) = intake_with(logs([1]));

        let err = count_overlap(&logs([0]), &mut rx, WAIT).await.unwrap_err();

        assert!(matches!(err, StreamError::NoOverlap(key) if key.block_number == 1));
    }

    #[tokio::test]
    async fn log_missing_from_history_is_rejected() {
        let history = logs([0, 1, 3, 4]);
        let (_tx, mut rx) = intake_with(logs([2, 3, 4]));

        let err = count_overlap(&history, &mut rx, WAIT).await.unwrap_err();

        assert!(matches!(err, StreamError::NoOverlap(key) if key.block_number == 2));
    }

    #[tokio::test]
    async fn gap_inside_overlap_is_rejected() {
        let (_tx, mut rx) = intake_with(logs([2, 4]));

        let err = count_overlap(&logs(0..5), &mut rx, WAIT).await.unwrap_err();

        assert!(matches!(err, StreamError::NoOverlap(key) if key.block_number == 4));
    }

    #[tokio::test]
    async fn conflicting_transaction_hash_is_rejected() {
        let mut historic = log(3);
        historic.transaction_hash = Some(B256::repeat_byte(0xaa));
        let mut live = log(3);
        live.transaction_hash = Some(B256::repeat_byte(0xbb));
        let (_tx, mut rx) = intake_with(vec![live]);

        let err = count_overlap(&[historic], &mut rx, WAIT).await.unwrap_err();

        assert!(matches!(err, StreamError::ConflictingLog(key) if key.block_number == 3));
    }

    #[tokio::test]
    async fn log_index_distinguishes_events_in_one_transaction() {
        let history: Vec<Log> = (0..3)
            .map(|idx| Log {
                block_number: Some(9),
                transaction_index: Some(1),
                log_index: Some(idx),
                ..Default::default()
            })
            .collect();
        let (_tx, mut rx) = intake_with(history[1..].to_vec());

        let overlap = count_overlap(&history, &mut rx, WAIT).await.unwrap();

        assert_eq!(overlap, 2);
    }
}
