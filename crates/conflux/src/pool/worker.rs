use crate::{
    cancel::CancelToken,
    stream::{SharedReceiver, recv_shared_or_cancel},
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Worker task responsible for draining jobs from the shared queue.
///
/// Each iteration races the cancellation token against the next job, and
/// again against the worker function itself. Cancellation is polled first,
/// so a worker that observes it exits without dequeuing anything further,
/// and an in-flight job is abandoned rather than awaited.
///
/// The loop ends when:
/// - the token fires,
/// - the queue is closed and empty (the pool was closed).
///
/// # Arguments
///
/// - `worker_id`: Index of this worker, `0..workers`, handed to the worker
///   function.
/// - `jobs`: The shared job queue.
/// - `results`: Where each job's outcome is published.
/// - `work`: The caller-supplied worker function.
/// - `token`: The pool's cancellation token.
pub(crate) async fn worker_loop<J, O, F, Fut>(
    worker_id: usize,
    jobs: SharedReceiver<J>,
    results: mpsc::UnboundedSender<O>,
    work: Arc<F>,
    token: CancelToken,
) where
    F: Fn(usize, J) -> Fut,
    Fut: Future<Output = O>,
{
    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} started");

    loop {
        let Some(job) = recv_shared_or_cancel(&token, &jobs).await else {
            break;
        };

        let outcome = tokio::select! {
            biased;
            () = token.cancelled() => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Worker {worker_id} abandoned an in-flight job");
                break;
            }
            outcome = work(worker_id, job) => outcome,
        };

        // A dropped results stream only means nobody is reading outcomes.
        let _ = results.send(outcome);
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} stopped");
}
