//! Event-driven core of the Portunus door access endpoint.
//!
//! Producers (card poll, door sensor, connectivity) publish [`Event`]s onto a
//! bounded [`EventBus`]. One consumer task drains the bus and, for every
//! event, runs the [`PolicyMachine`], hands the event to each [`Module`] in
//! the [`ModuleRegistry`], then fans it out to the [`SubscriberTable`].
//! [`Runtime`] wires this together and owns the bring-up sequence.
//!
//! Shared handles travel in a [`SystemContext`]; there are no global
//! singletons.
//!
//! [`Event`]: portunus_core::Event

pub mod bus;
pub mod context;
pub mod device_state;
pub mod dispatch;
pub mod module;
pub mod modules;
pub mod policy;
pub mod registry;
pub mod reporting;
pub mod runtime;

pub use bus::{EventBus, EventReceiver};
pub use context::SystemContext;
pub use device_state::{DeviceSnapshot, DeviceStatus};
pub use dispatch::{Dispatcher, Handler, SubscriberTable};
pub use module::Module;
pub use policy::{PolicyMachine, PolicyState, PolicyTransition};
pub use registry::ModuleRegistry;
pub use reporting::{
    EventRecord, Heartbeat, JsonLinesSink, LogSink, MemorySink, ReportRecord, ReportSink,
};
pub use runtime::{Runtime, RuntimeState};
