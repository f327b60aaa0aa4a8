//! Multi-stage pipelines.
//!
//! A [`Pipeline`] chains [`Stage`]s: each stage receives the previous stage's
//! output stream and returns a new one, starting its own task so stages
//! overlap in time. A stage closes its output exactly once, when its input
//! closes or the token fires.
//!
//! Order is preserved through every single-task stage such as
//! [`map_stage`]. A stage that fans out internally gives no such guarantee.

use crate::{
    cancel::CancelToken,
    stream::{STREAM_CAPACITY, recv_or_cancel, send_or_cancel},
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// One step of a [`Pipeline`]: stream in, stream out.
///
/// Implementations must spawn their own task and return immediately, and
/// must drop the output sender once the input is exhausted or the token
/// fires.
pub trait Stage<T>: Send + Sync {
    fn run(&self, token: CancelToken, input: mpsc::Receiver<T>) -> mpsc::Receiver<T>;
}

impl<T, F> Stage<T> for F
where
    F: Fn(CancelToken, mpsc::Receiver<T>) -> mpsc::Receiver<T> + Send + Sync,
{
    fn run(&self, token: CancelToken, input: mpsc::Receiver<T>) -> mpsc::Receiver<T> {
        self(token, input)
    }
}

/// An ordered chain of stages.
pub struct Pipeline<T> {
    stages: Vec<Box<dyn Stage<T>>>,
}

impl<T> Default for Pipeline<T> {
    fn default() -> Self {
        Self { stages: Vec::new() }
    }
}

impl<T> Pipeline<T>
where
    T: Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_stages(stages: Vec<Box<dyn Stage<T>>>) -> Self {
        Self { stages }
    }

    /// Appends a stage.
    #[must_use]
    pub fn stage(mut self, stage: impl Stage<T> + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Wires `input` through every stage and returns the final stream.
    ///
    /// With no stages the input is returned unchanged.
    pub fn execute(&self, token: &CancelToken, input: mpsc::Receiver<T>) -> mpsc::Receiver<T> {
        self.stages
            .iter()
            .fold(input, |stream, stage| stage.run(token.clone(), stream))
    }
}

/// Builds a stage that applies `f` to every value on one task, preserving
/// order.
///
/// # Panics
///
/// The returned stage panics if run outside a Tokio runtime.
pub fn map_stage<T, F>(f: F) -> impl Stage<T>
where
    T: Send + 'static,
    F: Fn(T) -> T + Send + Sync + 'static,
{
    let f = Arc::new(f);
    move |token: CancelToken, input: mpsc::Receiver<T>| {
        let (tx, rx) = mpsc::channel(STREAM_CAPACITY);
        tokio::spawn(relay(token, input, tx, Arc::clone(&f)));
        rx
    }
}

/// Moves values from `input` to `output` through `f` until either end
/// closes or the token fires. Dropping `output` on return closes the stream.
pub(crate) async fn relay<T, U, F>(
    token: CancelToken,
    mut input: mpsc::Receiver<T>,
    output: mpsc::Sender<U>,
    f: Arc<F>,
) where
    F: Fn(T) -> U,
{
    while let Some(value) = recv_or_cancel(&token, &mut input).await {
        if !send_or_cancel(&token, &output, f(value)).await {
            break;
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Stage finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::source;
    use core::time::Duration;
    use tokio::time::{Instant, sleep, timeout};
    use tokio_stream::{StreamExt, wrappers::ReceiverStream};

    async fn collect<T>(rx: mpsc::Receiver<T>) -> Vec<T> {
        ReceiverStream::new(rx).collect().await
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn doubles_then_adds_ten_in_order() {
        let token = CancelToken::new().with_timeout(Duration::from_secs(5));
        let pipeline = Pipeline::new()
            .stage(map_stage(|v: i32| v * 2))
            .stage(map_stage(|v: i32| v + 10));
        assert_eq!(pipeline.len(), 2);

        let output = pipeline.execute(&token, source(&token, 1..=5));
        assert_eq!(collect(output).await, vec![12, 14, 16, 18, 20]);
    }

    #[tokio::test]
    async fn accepts_hand_written_stages() {
        let token = CancelToken::new();
        let negate = |token: CancelToken, mut input: mpsc::Receiver<i64>| {
            let (tx, rx) = mpsc::channel(4);
            tokio::spawn(async move {
                while let Some(v) = recv_or_cancel(&token, &mut input).await {
                    if tx.send(-v).await.is_err() {
                        break;
                    }
                }
            });
            rx
        };

        let stages: Vec<Box<dyn Stage<i64>>> =
            vec![Box::new(negate), Box::new(map_stage(|v: i64| v * 3))];
        let pipeline = Pipeline::from_stages(stages);
        let output = pipeline.execute(&token, source(&token, [1, 2, 3]));
        assert_eq!(collect(output).await, vec![-3, -6, -9]);
    }

    fn delay_stage(delay: Duration) -> impl Stage<u32> {
        move |token: CancelToken, mut input: mpsc::Receiver<u32>| {
            let (tx, rx) = mpsc::channel(STREAM_CAPACITY);
            tokio::spawn(async move {
                while let Some(v) = recv_or_cancel(&token, &mut input).await {
                    sleep(delay).await;
                    if !send_or_cancel(&token, &tx, v).await {
                        break;
                    }
                }
            });
            rx
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stages_overlap_in_time() {
        const ITEMS: u32 = 5;
        let delay = Duration::from_millis(100);
        let token = CancelToken::new();
        let pipeline = Pipeline::new()
            .stage(delay_stage(delay))
            .stage(delay_stage(delay));

        let start = Instant::now();
        let output = pipeline.execute(&token, source(&token, 0..ITEMS));
        assert_eq!(collect(output).await, (0..ITEMS).collect::<Vec<_>>());

        // Overlapped: (ITEMS + 1) delays. Sequential would be 2 * ITEMS.
        let elapsed = start.elapsed();
        assert!(elapsed >= delay * (ITEMS + 1), "elapsed {elapsed:?}");
        assert!(elapsed < delay * (2 * ITEMS), "elapsed {elapsed:?}");
    }

    #[tokio::test]
    async fn empty_pipeline_passes_input_through() {
        let token = CancelToken::new();
        let pipeline = Pipeline::<u8>::new();
        assert!(pipeline.is_empty());

        let output = pipeline.execute(&token, source(&token, [4, 5]));
        assert_eq!(collect(output).await, vec![4, 5]);
    }

    #[tokio::test]
    async fn cancellation_closes_every_stage() {
        let token = CancelToken::new();
        let pipeline = Pipeline::new()
            .stage(map_stage(|v: u64| v + 1))
            .stage(map_stage(|v: u64| v * 2))
            .stage(map_stage(|v: u64| v - 1));

        // Endless input: only cancellation can end it.
        let mut output = pipeline.execute(&token, source(&token, 0_u64..));
        assert_eq!(output.recv().await, Some(1));

        token.cancel();
        timeout(Duration::from_secs(1), async {
            while output.recv().await.is_some() {}
        })
        .await
        .expect("pipeline must close after cancellation");
    }
}
