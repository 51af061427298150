//! Shared fixtures for the system integration tests.

#![allow(dead_code)]

use portunus_core::{Event, EventKind, SystemConfig};
use portunus_hardware::Uptime;
use portunus_system::{EventBus, EventReceiver, SubscriberTable, SystemContext};
use std::sync::Arc;

/// Context over a fresh bus, without a consumer. Tests drain the receiver
/// themselves.
pub fn context(config: SystemConfig) -> (SystemContext, EventReceiver) {
    let (bus, rx) = EventBus::new(config.bus.queue_length, config.bus.publish_timeout())
        .expect("valid bus configuration");
    let subscribers = SubscriberTable::new(config.bus.max_subscribers);
    let ctx = SystemContext::new(bus, subscribers, Arc::new(config), Uptime::start());
    (ctx, rx)
}

/// Everything currently queued.
pub fn drain(rx: &mut EventReceiver) -> Vec<Event> {
    std::iter::from_fn(|| rx.try_recv()).collect()
}

pub fn kinds(events: &[Event]) -> Vec<EventKind> {
    events.iter().map(|e| e.kind).collect()
}
