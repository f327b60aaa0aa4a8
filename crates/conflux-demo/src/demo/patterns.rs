//! One walkthrough per primitive. Each takes the shared demo token, so Ctrl+C
//! or the overall deadline stops whichever pattern is running.

use super::config::DemoConfig;
use anyhow::Context;
use conflux::{
    Broadcast, CancelToken, Pipeline, RateLimiter, WorkerPool, fan_in, fan_out, map_stage, source,
};
use std::sync::Arc;
use tokio::{
    sync::mpsc,
    time::{Instant, sleep},
};
use tracing::{info, warn};

async fn collect<T>(mut rx: mpsc::Receiver<T>) -> Vec<T> {
    let mut out = Vec::new();
    while let Some(value) = rx.recv().await {
        out.push(value);
    }
    out
}

pub async fn worker_pool(config: &DemoConfig, token: &CancelToken) -> anyhow::Result<()> {
    info!(
        "Worker pool: {} workers, {} jobs",
        config.workers, config.jobs
    );

    let mut pool = WorkerPool::new(config.workers)?;
    let mut results = pool.results().context("results stream already taken")?;

    let delay = config.job_delay;
    pool.start(token.clone(), move |worker, job: usize| async move {
        info!("Worker {worker} processing job {job}");
        sleep(delay).await;
        job
    })?;

    for job in 1..=config.jobs {
        pool.submit(job).await?;
    }
    pool.close().await;

    let mut completed = 0;
    while results.recv().await.is_some() {
        completed += 1;
    }
    info!("{completed}/{} jobs completed", config.jobs);

    Ok(())
}

pub async fn pipeline(_config: &DemoConfig, token: &CancelToken) -> anyhow::Result<()> {
    info!("Pipeline: x2 then +10");

    let pipeline = Pipeline::new()
        .stage(map_stage(|v: i64| v * 2))
        .stage(map_stage(|v: i64| v + 10));
    let output = pipeline.execute(token, source(token, 1..=3));

    info!("Results: {:?}", collect(output).await);
    Ok(())
}

pub async fn fan(config: &DemoConfig, token: &CancelToken) -> anyhow::Result<()> {
    info!("Fan-out/fan-in: squaring across {} workers", config.workers);

    let outputs = fan_out(token, source(token, 1..=5_u64), config.workers, |n| n * n);
    let squares = collect(fan_in(token, outputs)).await;

    info!("Squared values (arrival order): {squares:?}");
    Ok(())
}

pub async fn rate_limiter(config: &DemoConfig, token: &CancelToken) -> anyhow::Result<()> {
    info!("Rate limiter: {} requests/second", config.rate);

    let limiter = RateLimiter::new(config.rate)?;
    let start = Instant::now();

    for request in 1..=config.requests {
        limiter.wait(token).await?;
        info!("Request {request} admitted at {:?}", start.elapsed());
    }
    limiter.stop();

    Ok(())
}

pub async fn broadcast(config: &DemoConfig, token: &CancelToken) -> anyhow::Result<()> {
    info!(
        "Broadcast: {} subscribers, {} messages",
        config.subscribers, config.messages
    );

    let broadcast = Arc::new(Broadcast::new());
    let mut readers = Vec::with_capacity(config.subscribers);
    for n in 1..=config.subscribers {
        let mut stream = broadcast.subscribe(format!("subscriber{n}"), config.subscriber_buffer)?;
        readers.push(tokio::spawn(async move {
            while let Some(msg) = stream.recv().await {
                info!("Subscriber {n} received: {msg}");
            }
        }));
    }

    for n in 1..=config.messages {
        if let Err(e) = broadcast.send(token, format!("Message {n}")) {
            if e.is_cancellation() {
                return Err(e.into());
            }
            warn!("Error sending: {e}");
        }
        sleep(core::time::Duration::from_millis(100)).await;
    }

    broadcast.close();
    for reader in futures::future::join_all(readers).await {
        reader?;
    }

    Ok(())
}
