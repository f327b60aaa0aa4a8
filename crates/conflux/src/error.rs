//! Error types shared by every primitive in the crate.
//!
//! ## Error Cases
//! - `Cancelled`: the caller's [`crate::CancelToken`] was cancelled.
//! - `DeadlineExceeded`: the caller's token passed its deadline.
//! - `CapacityExceeded`: a broadcast hit one or more full subscriber buffers.
//! - `InvalidArgument`: a constructor received an unusable size or rate.
//! - `AlreadyStarted`: a worker pool was started twice.
//! - `Closed`: a broadcast was used after shutdown.
//!
//! Failures produced by caller-supplied work functions are never wrapped in
//! this type; they travel on the result path exactly as returned.

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Unified error type for the concurrency primitives.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The cancellation token fired before the operation could complete.
    #[error("Operation cancelled")]
    Cancelled,

    /// The cancellation token's deadline elapsed.
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// One or more subscribers had no room left in their buffer. Delivery to
    /// every other subscriber was still attempted.
    #[error("Subscriber channel full: {}", .subscribers.join(", "))]
    CapacityExceeded { subscribers: Vec<String> },

    /// A constructor argument was out of range.
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// [`crate::WorkerPool::start`] was called on a running pool.
    #[error("Worker pool already started")]
    AlreadyStarted,

    /// The broadcast was shut down.
    #[error("Broadcast is closed")]
    Closed,
}

impl Error {
    /// Returns `true` for both token outcomes: explicit cancellation and an
    /// elapsed deadline.
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_error_lists_every_full_subscriber() {
        let err = Error::CapacityExceeded {
            subscribers: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.to_string(), "Subscriber channel full: a, b");
        assert!(!err.is_cancellation());
    }

    #[test]
    fn token_outcomes_are_cancellations() {
        assert!(Error::Cancelled.is_cancellation());
        assert!(Error::DeadlineExceeded.is_cancellation());
        assert!(!Error::Closed.is_cancellation());
    }
}
