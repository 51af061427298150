//! Reactive module interface.

use crate::context::SystemContext;
use portunus_core::{Event, Result};

/// A component with a uniform lifecycle, driven by bus events.
///
/// The registry calls [`initialize`](Module::initialize) on every module,
/// then [`start`](Module::start), then [`handle`](Module::handle) for every
/// dequeued event, in registration order. `handle` runs on the consumer task
/// and must not block; timed work is spawned through the context.
pub trait Module: Send {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Bring up owned hardware. No tasks may be spawned yet.
    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    /// Spawn background tasks and register subscribers.
    fn start(&mut self, _ctx: &SystemContext) -> Result<()> {
        Ok(())
    }

    /// React to one event.
    fn handle(&mut self, _event: &Event, _ctx: &SystemContext) {}
}
