//! Token-bucket rate limiting.
//!
//! The bucket holds at most `C = requests_per_second` tokens and starts full,
//! so up to `C` callers are admitted immediately. A background task adds one
//! token every `1/C` seconds while the bucket is below capacity; ticks that
//! find it full are discarded. Each admission consumes exactly one token.

use crate::{
    cancel::CancelToken,
    error::{Error, Result},
};
use core::time::Duration;
use std::sync::Arc;
use tokio::{
    sync::Semaphore,
    time::{Instant, MissedTickBehavior, interval_at},
};

/// Admission control for a caller-driven operation.
///
/// Tokens are the available permits of a [`Semaphore`]. Only the refill task
/// adds permits, and only while fewer than `capacity` are available, so the
/// count stays within `0..=capacity`.
#[derive(Debug)]
pub struct RateLimiter {
    tokens: Arc<Semaphore>,
    capacity: usize,
    period: Duration,
    shutdown: CancelToken,
}

impl RateLimiter {
    /// Creates a full bucket admitting `requests_per_second` operations per
    /// second and starts its refill task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the rate is zero, exceeds what
    /// a semaphore can hold, or is too high for a refill period of at least
    /// one nanosecond.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new(requests_per_second: u32) -> Result<Self> {
        if requests_per_second == 0 {
            return Err(Error::invalid("requests per second must be greater than 0"));
        }
        let capacity = requests_per_second as usize;
        if capacity > Semaphore::MAX_PERMITS {
            return Err(Error::invalid(format!(
                "requests per second ({capacity}) exceeds {}",
                Semaphore::MAX_PERMITS
            )));
        }

        let period = Duration::from_secs(1) / requests_per_second;
        if period.is_zero() {
            return Err(Error::invalid(format!(
                "requests per second ({capacity}) exceeds one per nanosecond"
            )));
        }
        let tokens = Arc::new(Semaphore::new(capacity));
        let shutdown = CancelToken::new();

        tokio::spawn(refill(
            Arc::clone(&tokens),
            capacity,
            period,
            shutdown.clone(),
        ));

        Ok(Self {
            tokens,
            capacity,
            period,
            shutdown,
        })
    }

    /// Waits for a token and consumes it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] or [`Error::DeadlineExceeded`] if the token
    /// fires first, including when it has already fired on entry. No token is
    /// consumed in that case.
    pub async fn wait(&self, token: &CancelToken) -> Result<()> {
        if let Some(err) = token.error() {
            return Err(err);
        }

        tokio::select! {
            biased;
            () = token.cancelled() => Err(token.fired()),
            permit = self.tokens.acquire() => {
                // The semaphore is never closed.
                let Ok(permit) = permit else {
                    return Err(token.fired());
                };
                permit.forget();
                Ok(())
            }
        }
    }

    /// Consumes a token if one is available right now.
    pub fn try_acquire(&self) -> bool {
        self.tokens
            .try_acquire()
            .map(|permit| permit.forget())
            .is_ok()
    }

    /// Tokens currently in the bucket.
    pub fn available(&self) -> usize {
        self.tokens.available_permits()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Interval between refills.
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Halts the refill task. Idempotent.
    ///
    /// Tokens already in the bucket can still be taken; once they are gone,
    /// [`RateLimiter::wait`] only returns when the caller's token fires.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn refill(tokens: Arc<Semaphore>, capacity: usize, period: Duration, shutdown: CancelToken) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                if tokens.available_permits() < capacity {
                    tokens.add_permits(1);
                }
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!("Rate limiter refill stopped");
}
