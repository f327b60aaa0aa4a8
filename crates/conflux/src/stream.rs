//! Streams: bounded, closable MPSC channels carrying payloads between tasks.
//!
//! A stream is the receiving half of a [`tokio::sync::mpsc`] channel. It
//! closes once every sender has been dropped, after which the receiver
//! yields the buffered values and then `None`. Since closing is dropping,
//! writing to a closed stream cannot be expressed.

use crate::cancel::CancelToken;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// Buffer size of the streams created by this crate. One slot keeps the
/// hand-off between producer and consumer as close to rendezvous as a bounded
/// Tokio channel allows.
pub const STREAM_CAPACITY: usize = 1;

/// Spawns a producer that feeds every item of `items` into a new stream, in
/// order, then closes it. Stops early if the token fires or the receiver is
/// dropped.
///
/// # Panics
///
/// Panics if called outside a Tokio runtime.
pub fn source<T, I>(token: &CancelToken, items: I) -> mpsc::Receiver<T>
where
    T: Send + 'static,
    I: IntoIterator<Item = T>,
    I::IntoIter: Send + 'static,
{
    let (tx, rx) = mpsc::channel(STREAM_CAPACITY);
    let token = token.clone();
    let items = items.into_iter();

    tokio::spawn(async move {
        for item in items {
            if !send_or_cancel(&token, &tx, item).await {
                break;
            }
        }
    });

    rx
}

/// A stream read by several tasks at once. Whichever task holds the lock when
/// a value arrives receives it, so dispatch is first-available-consumer.
pub(crate) type SharedReceiver<T> = Arc<Mutex<mpsc::Receiver<T>>>;

pub(crate) fn shared<T>(input: mpsc::Receiver<T>) -> SharedReceiver<T> {
    Arc::new(Mutex::new(input))
}

/// Like [`recv_or_cancel`], competing with the other holders of `input`.
pub(crate) async fn recv_shared_or_cancel<T>(
    token: &CancelToken,
    input: &SharedReceiver<T>,
) -> Option<T> {
    tokio::select! {
        biased;
        () = token.cancelled() => None,
        value = async { input.lock().await.recv().await } => value,
    }
}

/// Receives the next value unless the token fires first.
///
/// `None` means the stream closed or the token fired; either way the caller
/// should stop.
pub(crate) async fn recv_or_cancel<T>(
    token: &CancelToken,
    input: &mut mpsc::Receiver<T>,
) -> Option<T> {
    tokio::select! {
        biased;
        () = token.cancelled() => None,
        value = input.recv() => value,
    }
}

/// Sends `value` unless the token fires first. Returns `false` when the
/// caller should stop: cancelled, or nobody is listening anymore.
pub(crate) async fn send_or_cancel<T>(
    token: &CancelToken,
    output: &mpsc::Sender<T>,
    value: T,
) -> bool {
    tokio::select! {
        biased;
        () = token.cancelled() => false,
        sent = output.send(value) => sent.is_ok(),
    }
}
