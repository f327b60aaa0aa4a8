//! Bounded pool of asynchronous workers over a shared job queue.
//!
//! This module defines the [`WorkerPool`] struct, which runs a fixed number
//! of Tokio tasks competing for jobs from one bounded queue. Every job that
//! runs to completion produces exactly one outcome on the results stream.
//! Shutdown is either graceful ([`WorkerPool::close`], which drains the queue)
//! or cooperative via the shared [`CancelToken`], which abandons whatever is
//! still queued or running.

use super::worker::worker_loop;
use crate::{
    cancel::CancelToken,
    error::{Error, Result},
    stream::{SharedReceiver, shared},
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;

/// A fixed-size pool of asynchronous workers.
///
/// `J` is the job payload, `O` the outcome produced by the worker function.
/// Callers that want failures surfaced use a `Result` for `O`; the pool
/// publishes outcomes verbatim and never retries.
///
/// The job queue holds `2 * workers` entries. [`WorkerPool::submit`] waits
/// while it is full.
pub struct WorkerPool<J, O> {
    workers: usize,
    jobs_tx: mpsc::Sender<J>,
    jobs_rx: Option<SharedReceiver<J>>,
    results_tx: Option<mpsc::UnboundedSender<O>>,
    results_rx: Option<mpsc::UnboundedReceiver<O>>,
    token: Option<CancelToken>,
    tracker: TaskTracker,
}

impl<J, O> WorkerPool<J, O>
where
    J: Send + 'static,
    O: Send + 'static,
{
    /// Creates an idle pool of `workers` workers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `workers` is zero.
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(Error::invalid("worker count must be greater than 0"));
        }
        let capacity = workers
            .checked_mul(2)
            .ok_or_else(|| Error::invalid("worker count overflows the queue capacity"))?;

        let (jobs_tx, jobs_rx) = mpsc::channel(capacity);
        // Unbounded so that `close` never waits on a caller who only reads
        // results afterwards.
        let (results_tx, results_rx) = mpsc::unbounded_channel();

        Ok(Self {
            workers,
            jobs_tx,
            jobs_rx: Some(shared(jobs_rx)),
            results_tx: Some(results_tx),
            results_rx: Some(results_rx),
            token: None,
            tracker: TaskTracker::new(),
        })
    }

    /// Number of workers this pool runs.
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Capacity of the job queue (`2 * workers`).
    pub const fn queue_capacity(&self) -> usize {
        self.workers * 2
    }

    /// Spawns the workers onto the current Tokio runtime.
    ///
    /// Each worker loops until the token fires or the pool is closed and the
    /// queue drained, calling `work(worker_id, job)` for every job it
    /// dequeues.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyStarted`] if the pool is already running.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start<F, Fut>(&mut self, token: CancelToken, work: F) -> Result<()>
    where
        F: Fn(usize, J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
    {
        let (Some(jobs), Some(results)) = (self.jobs_rx.take(), self.results_tx.take()) else {
            return Err(Error::AlreadyStarted);
        };

        #[cfg(feature = "tracing")]
        tracing::debug!("Starting worker pool with {} workers", self.workers);

        let work = Arc::new(work);
        for worker_id in 0..self.workers {
            self.tracker.spawn(worker_loop(
                worker_id,
                Arc::clone(&jobs),
                results.clone(),
                Arc::clone(&work),
                token.clone(),
            ));
        }
        self.token = Some(token);

        Ok(())
    }

    /// Enqueues one job, waiting while the queue is full.
    ///
    /// Jobs may be submitted before [`WorkerPool::start`]; they wait in the
    /// queue (and fill it) until workers exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] or [`Error::DeadlineExceeded`] if the
    /// pool's token fires first. The job is dropped in that case.
    pub async fn submit(&self, job: J) -> Result<()> {
        let Some(token) = &self.token else {
            return self.jobs_tx.send(job).await.map_err(|_| Error::Cancelled);
        };

        tokio::select! {
            biased;
            () = token.cancelled() => Err(token.fired()),
            // The queue only closes once every worker exited, which
            // only happens on cancellation while the pool is open.
            sent = self.jobs_tx.send(job) => sent.map_err(|_| token.fired()),
        }
    }

    /// Returns the results stream.
    ///
    /// The stream yields one outcome per completed job and closes once
    /// [`WorkerPool::close`] returns (or every worker exited on
    /// cancellation). Only the first call returns `Some`.
    pub fn results(&mut self) -> Option<mpsc::UnboundedReceiver<O>> {
        self.results_rx.take()
    }

    /// Stops admission and waits for every worker to exit.
    ///
    /// Without cancellation this drains all queued jobs first. If the token
    /// fires, in-flight jobs are abandoned and queued jobs are dropped, so
    /// fewer outcomes than submissions is the expected result.
    ///
    /// Consumes the pool: submitting after close does not compile.
    pub async fn close(self) {
        let Self {
            jobs_tx,
            jobs_rx,
            results_tx,
            tracker,
            ..
        } = self;

        drop(jobs_tx);
        // Never started: nobody will drain these.
        drop(jobs_rx);
        drop(results_tx);

        tracker.close();
        tracker.wait().await;

        #[cfg(feature = "tracing")]
        tracing::debug!("Worker pool closed");
    }
}
