//! Cooperative cancellation shared by every primitive.
//!
//! A [`CancelToken`] is a monotonic stop signal with an optional deadline.
//! It wraps [`tokio_util::sync::CancellationToken`], so clones observe the
//! same flag and child tokens are cancelled together with their parent.
//! Every blocking call in this crate takes a token and races it against its
//! own wait condition, with cancellation checked first.

use crate::error::Error;
use core::time::Duration;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

/// A cloneable, monotonic cancellation signal with an optional deadline.
///
/// Once fired (either by [`CancelToken::cancel`] on it or an ancestor, or by
/// its deadline elapsing) it stays fired, and any number of readers can
/// observe it without consuming it.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: CancellationToken,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// Creates a root token with no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a child token. Cancelling `self` cancels the child; cancelling
    /// the child leaves `self` untouched.
    pub fn child(&self) -> Self {
        Self {
            inner: self.inner.child_token(),
            deadline: self.deadline,
        }
    }

    /// Creates a child token that additionally fires at `deadline`. If this
    /// token already carries an earlier deadline, the earlier one wins.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        };
        Self {
            inner: self.inner.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Creates a child token that fires `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Fires the token. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns `true` once the token was cancelled or its deadline passed.
    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled() || self.deadline_elapsed()
    }

    /// Returns why the token fired, or `None` while it is still live.
    ///
    /// Explicit cancellation is reported in preference to the deadline when
    /// both apply.
    pub fn error(&self) -> Option<Error> {
        if self.inner.is_cancelled() {
            Some(Error::Cancelled)
        } else if self.deadline_elapsed() {
            Some(Error::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Resolves once the token fires. Resolves immediately if it already has.
    pub async fn cancelled(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    () = self.inner.cancelled() => {}
                    () = sleep_until(deadline) => {}
                }
            }
            None => self.inner.cancelled().await,
        }
    }

    /// Like [`CancelToken::error`], but for use right after
    /// [`CancelToken::cancelled`] resolved, when the token is known to have
    /// fired.
    pub(crate) fn fired(&self) -> Error {
        self.error().unwrap_or(Error::Cancelled)
    }

    fn deadline_elapsed(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}
