//! Fan-out / fan-in.
//!
//! [`fan_out`] starts several tasks that compete for values from one input
//! stream, each writing its results to its own output stream. [`fan_in`]
//! merges several streams into one.
//!
//! Neither gives any ordering guarantee across streams: which task receives a
//! value, and how merged values interleave, depends on the scheduler. Code
//! consuming the merged stream must treat its order as non-deterministic.

use crate::{
    cancel::CancelToken,
    pipeline::relay,
    stream::{STREAM_CAPACITY, SharedReceiver, recv_shared_or_cancel, send_or_cancel, shared},
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;

/// Distributes `input` across `workers` concurrent tasks, each applying `f`.
///
/// There is no partitioning: the first idle task takes the next value. Every
/// returned stream closes once the input is exhausted, its consumer is
/// dropped, or the token fires. With zero workers the input is dropped and
/// the returned vector is empty.
///
/// # Panics
///
/// Panics if called outside a Tokio runtime.
pub fn fan_out<T, U, F>(
    token: &CancelToken,
    input: mpsc::Receiver<T>,
    workers: usize,
    f: F,
) -> Vec<mpsc::Receiver<U>>
where
    T: Send + 'static,
    U: Send + 'static,
    F: Fn(T) -> U + Send + Sync + 'static,
{
    let input = shared(input);
    let f = Arc::new(f);

    (0..workers)
        .map(|_worker_id| {
            let (tx, rx) = mpsc::channel(STREAM_CAPACITY);
            tokio::spawn(compete(
                token.clone(),
                Arc::clone(&input),
                tx,
                Arc::clone(&f),
            ));
            rx
        })
        .collect()
}

async fn compete<T, U, F>(
    token: CancelToken,
    input: SharedReceiver<T>,
    output: mpsc::Sender<U>,
    f: Arc<F>,
) where
    F: Fn(T) -> U,
{
    while let Some(value) = recv_shared_or_cancel(&token, &input).await {
        if !send_or_cancel(&token, &output, f(value)).await {
            break;
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Fan-out worker finished");
}

/// Merges `inputs` into a single stream.
///
/// One task forwards each input. The merged stream closes only after every
/// forwarding task has finished, that is once all inputs are closed or the
/// token fires. An empty `inputs` yields an already-closed stream.
///
/// # Panics
///
/// Panics if called outside a Tokio runtime.
pub fn fan_in<T, I>(token: &CancelToken, inputs: I) -> mpsc::Receiver<T>
where
    T: Send + 'static,
    I: IntoIterator<Item = mpsc::Receiver<T>>,
{
    let (tx, rx) = mpsc::channel(STREAM_CAPACITY);
    let forward = Arc::new(core::convert::identity::<T>);
    let tracker = TaskTracker::new();

    for input in inputs {
        tracker.spawn(relay(
            token.clone(),
            input,
            tx.clone(),
            Arc::clone(&forward),
        ));
    }
    tracker.close();

    tokio::spawn(async move {
        tracker.wait().await;
        drop(tx);

        #[cfg(feature = "tracing")]
        tracing::trace!("Fan-in closed");
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::source;
    use core::time::Duration;
    use tokio::time::timeout;
    use tokio_stream::{StreamExt, wrappers::ReceiverStream};

    async fn collect<T>(rx: mpsc::Receiver<T>) -> Vec<T> {
        ReceiverStream::new(rx).collect().await
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn squares_sum_to_385_for_any_worker_count() {
        for workers in [1, 2, 3, 10, 16] {
            let token = CancelToken::new().with_timeout(Duration::from_secs(5));
            let outputs = fan_out(&token, source(&token, 1..=10), workers, |n: u64| n * n);
            assert_eq!(outputs.len(), workers);

            let merged = collect(fan_in(&token, outputs)).await;
            assert_eq!(merged.len(), 10);
            assert_eq!(merged.iter().sum::<u64>(), 385, "workers = {workers}");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn every_value_is_consumed_exactly_once() {
        let token = CancelToken::new();
        let outputs = fan_out(&token, source(&token, 0..200_u32), 4, |n| n);

        let mut merged = collect(fan_in(&token, outputs)).await;
        merged.sort_unstable();
        assert_eq!(merged, (0..200).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn zero_workers_yields_no_streams() {
        let token = CancelToken::new();
        let outputs = fan_out(&token, source(&token, [1, 2]), 0, |n: i32| n);
        assert!(outputs.is_empty());
    }

    #[tokio::test]
    async fn empty_fan_in_is_closed() {
        let token = CancelToken::new();
        let mut merged = fan_in::<u8, _>(&token, Vec::new());
        assert_eq!(merged.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn fan_in_waits_for_every_input() {
        let token = CancelToken::new();
        let (tx_a, rx_a) = mpsc::channel(4);
        let (tx_b, rx_b) = mpsc::channel(4);
        let mut merged = fan_in(&token, [rx_a, rx_b]);

        tx_a.send("a").await.unwrap();
        drop(tx_a);
        assert_eq!(merged.recv().await, Some("a"));

        // `b` is still open, so the merged stream must stay open too.
        assert!(
            timeout(Duration::from_millis(100), merged.recv())
                .await
                .is_err()
        );

        tx_b.send("b").await.unwrap();
        drop(tx_b);
        assert_eq!(merged.recv().await, Some("b"));
        assert_eq!(merged.recv().await, None);
    }

    #[tokio::test]
    async fn cancellation_closes_the_merged_stream() {
        let token = CancelToken::new();
        let outputs = fan_out(&token, source(&token, 0_u64..), 4, |n| n + 1);
        let mut merged = fan_in(&token, outputs);

        assert!(merged.recv().await.is_some());
        token.cancel();

        timeout(Duration::from_secs(1), async {
            while merged.recv().await.is_some() {}
        })
        .await
        .expect("merged stream must close after cancellation");
    }
}
