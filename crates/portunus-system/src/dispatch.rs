//! Subscriber table and event dispatch.
//!
//! Subscribers register a callback for one [`EventKind`]. Dispatch takes a
//! point-in-time copy of the matching callbacks under the table lock,
//! releases the lock, then invokes the copy. A callback may therefore
//! subscribe further callbacks without deadlocking; those take effect from
//! the next dispatched event.
//!
//! Callbacks run on the consumer task and must not block. Work that can wait
//! belongs in the subscriber's own queue (see the reporter module).

use crate::bus::EventReceiver;
use parking_lot::Mutex;
use portunus_core::{Error, Event, EventKind, Result};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Subscriber callback. Context is whatever the closure captures.
pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

struct Subscription {
    kind: EventKind,
    handler: Handler,
}

/// Bounded table of event subscribers.
#[derive(Clone)]
pub struct SubscriberTable {
    entries: Arc<Mutex<Vec<Subscription>>>,
    capacity: usize,
}

impl fmt::Debug for SubscriberTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberTable")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl SubscriberTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::with_capacity(capacity))),
            capacity,
        }
    }

    /// Register `handler` for events of `kind`.
    ///
    /// Handlers for the same kind run in registration order.
    ///
    /// # Errors
    ///
    /// `Error::TooManySubscribers` when the table is full.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Result<()>
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            return Err(Error::TooManySubscribers {
                capacity: self.capacity,
            });
        }
        entries.push(Subscription {
            kind,
            handler: Arc::new(handler),
        });
        debug!(%kind, total = entries.len(), "Subscriber added");
        Ok(())
    }

    /// Copy of the handlers currently registered for `kind`.
    pub fn snapshot(&self, kind: EventKind) -> Vec<Handler> {
        self.entries
            .lock()
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| Arc::clone(&s.handler))
            .collect()
    }

    /// Invoke every handler registered for `event.kind`.
    ///
    /// Returns the number of handlers invoked.
    pub fn dispatch(&self, event: &Event) -> usize {
        let handlers = self.snapshot(event.kind);
        for handler in &handlers {
            handler(event);
        }
        trace!(kind = %event.kind, handlers = handlers.len(), "Dispatched");
        handlers.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Single consumer of the bus: dequeues events in FIFO order and fans each
/// out to the subscriber table.
#[derive(Debug)]
pub struct Dispatcher {
    rx: EventReceiver,
    table: SubscriberTable,
}

impl Dispatcher {
    pub fn new(rx: EventReceiver, table: SubscriberTable) -> Self {
        Self { rx, table }
    }

    /// Wait for the next event, or `None` on cancellation or when the bus
    /// has no producers left.
    pub async fn next(&mut self, cancel: &CancellationToken) -> Option<Event> {
        tokio::select! {
            _ = cancel.cancelled() => None,
            event = self.rx.recv() => event,
        }
    }

    /// Fan one event out to its subscribers.
    pub fn fan_out(&self, event: &Event) -> usize {
        self.table.dispatch(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_capacity_is_enforced() {
        let table = SubscriberTable::new(2);
        table.subscribe(EventKind::Boot, |_| {}).unwrap();
        table.subscribe(EventKind::Feedback, |_| {}).unwrap();

        assert_eq!(
            table.subscribe(EventKind::Boot, |_| {}),
            Err(Error::TooManySubscribers { capacity: 2 })
        );
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_dispatch_matches_kind_only() {
        let table = SubscriberTable::new(4);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        table
            .subscribe(EventKind::DoorOpened, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        assert_eq!(table.dispatch(&Event::door_opened(0)), 1);
        assert_eq!(table.dispatch(&Event::door_closed(0)), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let table = SubscriberTable::new(4);
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            table
                .subscribe(EventKind::Boot, move |_| order.lock().push(tag))
                .unwrap();
        }

        table.dispatch(&Event::boot(0));
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }
}
