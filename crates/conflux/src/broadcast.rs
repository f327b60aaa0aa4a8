//! One-to-many publishing.
//!
//! A [`Broadcast`] keeps a registry of subscriber streams, each with its own
//! buffer. [`Broadcast::send`] never waits on a slow subscriber: delivery is
//! attempted with `try_send` to every subscriber, and those whose buffer is
//! full are reported together once the pass is over. Delivery is therefore
//! per-subscriber, not all-or-nothing.
//!
//! The registry sits behind a shared/exclusive [`RwLock`]. Senders share the
//! read lock and run concurrently; subscribe, unsubscribe and close take it
//! exclusively. A subscriber's
//! sender is dropped (closing its stream) while the write lock is still held,
//! so no send can observe an entry whose stream is already closed.

use crate::{
    cancel::CancelToken,
    error::{Error, Result},
};
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::mpsc::{self, error::TrySendError};

struct Registry<T> {
    subscribers: HashMap<String, mpsc::Sender<T>>,
    closed: bool,
}

/// Publishes each message to every current subscriber.
pub struct Broadcast<T> {
    registry: RwLock<Registry<T>>,
}

impl<T> Default for Broadcast<T> {
    fn default() -> Self {
        Self {
            registry: RwLock::new(Registry {
                subscribers: HashMap::new(),
                closed: false,
            }),
        }
    }
}

impl<T: Clone> Broadcast<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber with a buffer of `capacity` messages and returns
    /// its stream.
    ///
    /// Subscribing again with an id already in use replaces the previous
    /// subscriber, whose stream is closed.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `capacity` is zero.
    /// - [`Error::Closed`] after [`Broadcast::close`].
    pub fn subscribe(&self, id: impl Into<String>, capacity: usize) -> Result<mpsc::Receiver<T>> {
        if capacity == 0 {
            return Err(Error::invalid("subscriber capacity must be greater than 0"));
        }

        let mut registry = self.registry.write();
        if registry.closed {
            return Err(Error::Closed);
        }

        let id = id.into();
        let (tx, rx) = mpsc::channel(capacity);

        #[cfg(feature = "tracing")]
        tracing::debug!("Subscriber {id} joined with capacity {capacity}");

        if let Some(previous) = registry.subscribers.insert(id, tx) {
            drop(previous);
        }
        Ok(rx)
    }

    /// Removes a subscriber and closes its stream. Returns `false` if no such
    /// subscriber was registered.
    pub fn unsubscribe(&self, id: &str) -> bool {
        let mut registry = self.registry.write();
        let Some(sender) = registry.subscribers.remove(id) else {
            return false;
        };
        drop(sender);

        #[cfg(feature = "tracing")]
        tracing::debug!("Subscriber {id} left");

        true
    }

    /// Delivers a clone of `msg` to every subscriber without blocking.
    ///
    /// Subscribers whose stream was dropped are skipped. The token is checked
    /// before each delivery; once it fires, the remaining subscribers are not
    /// attempted.
    ///
    /// # Errors
    ///
    /// - [`Error::Cancelled`] / [`Error::DeadlineExceeded`] if the token fired.
    /// - [`Error::CapacityExceeded`] naming every subscriber whose buffer was
    ///   full. All other subscribers still received the message.
    /// - [`Error::Closed`] after [`Broadcast::close`].
    pub fn send(&self, token: &CancelToken, msg: T) -> Result<()> {
        let registry = self.registry.read();
        if registry.closed {
            return Err(Error::Closed);
        }

        let mut full = Vec::new();
        for (id, subscriber) in &registry.subscribers {
            if let Some(err) = token.error() {
                return Err(err);
            }
            match subscriber.try_send(msg.clone()) {
                Ok(()) | Err(TrySendError::Closed(_)) => {}
                Err(TrySendError::Full(_)) => full.push(id.clone()),
            }
        }
        if let Some(err) = token.error() {
            return Err(err);
        }

        if full.is_empty() {
            Ok(())
        } else {
            full.sort_unstable();
            Err(Error::CapacityExceeded { subscribers: full })
        }
    }

    /// Closes every subscriber stream and empties the registry. Any later
    /// subscribe or send returns [`Error::Closed`]. Idempotent.
    pub fn close(&self) {
        let mut registry = self.registry.write();
        registry.closed = true;
        registry.subscribers.clear();

        #[cfg(feature = "tracing")]
        tracing::debug!("Broadcast closed");
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.read().subscribers.len()
    }

    pub fn is_closed(&self) -> bool {
        self.registry.read().closed
    }
}
