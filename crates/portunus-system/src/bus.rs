//! Bounded event bus.
//!
//! Many producers publish [`Event`] values into one bounded FIFO; a single
//! consumer drains it. When the queue is full the newest publish is rejected
//! with [`Error::QueueFull`] after at most the publish timeout; queued events
//! are never evicted.
//!
//! ```
//! use portunus_core::{Error, Event};
//! use portunus_system::EventBus;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (bus, mut rx) = EventBus::new(1, Duration::from_millis(10)).unwrap();
//!
//! bus.publish(Event::boot(0)).await.unwrap();
//! assert_eq!(bus.try_publish(Event::boot(1)), Err(Error::QueueFull));
//!
//! assert_eq!(rx.recv().await, Some(Event::boot(0)));
//! # }
//! ```

use portunus_core::{Error, Event, Result};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::SendTimeoutError, error::TrySendError};

/// Producer side of the bus. Cheap to clone; one clone per producer task.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: mpsc::Sender<Event>,
    publish_timeout: Duration,
}

/// Consumer side of the bus.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::Receiver<Event>,
}

impl EventBus {
    /// Create a bus holding at most `capacity` events.
    ///
    /// # Errors
    ///
    /// `Error::QueueCreateFailed` if `capacity` is zero.
    pub fn new(capacity: usize, publish_timeout: Duration) -> Result<(Self, EventReceiver)> {
        if capacity == 0 {
            return Err(Error::QueueCreateFailed(
                "event queue capacity must be non-zero".to_string(),
            ));
        }
        let (tx, rx) = mpsc::channel(capacity);
        Ok((Self { tx, publish_timeout }, EventReceiver { rx }))
    }

    /// Publish with the configured timeout.
    pub async fn publish(&self, event: Event) -> Result<()> {
        self.publish_within(event, self.publish_timeout).await
    }

    /// Publish, waiting at most `timeout` for space. A zero timeout never
    /// waits.
    ///
    /// # Errors
    ///
    /// - `Error::QueueFull` if no space frees up in time.
    /// - `Error::NotInitialized` if the consumer is gone.
    pub async fn publish_within(&self, event: Event, timeout: Duration) -> Result<()> {
        if timeout.is_zero() {
            return self.try_publish(event);
        }
        self.tx
            .send_timeout(event, timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => Error::QueueFull,
                SendTimeoutError::Closed(_) => Error::NotInitialized("event bus".to_string()),
            })
    }

    /// Publish without waiting. Safe to call from synchronous callbacks.
    pub fn try_publish(&self, event: Event) -> Result<()> {
        self.tx.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => Error::QueueFull,
            TrySendError::Closed(_) => Error::NotInitialized("event bus".to_string()),
        })
    }

    /// Maximum number of queued events.
    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Events currently waiting for the consumer.
    pub fn pending(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn publish_timeout(&self) -> Duration {
        self.publish_timeout
    }
}

impl EventReceiver {
    /// Wait for the next event. `None` once every producer is dropped.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Take the next event if one is queued.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }
}
