//! Shared handles passed to every module and task.

use crate::bus::EventBus;
use crate::device_state::DeviceStatus;
use crate::dispatch::SubscriberTable;
use portunus_core::{Error, Event, EventKind, Result, SystemConfig};
use portunus_hardware::Uptime;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::warn;

/// Everything a module needs to talk to the rest of the system.
///
/// Cloning is cheap; clones share the same bus, table, status and clock.
#[derive(Debug, Clone)]
pub struct SystemContext {
    pub bus: EventBus,
    pub subscribers: SubscriberTable,
    pub status: DeviceStatus,
    pub config: Arc<SystemConfig>,
    pub uptime: Uptime,
    shutdown: CancellationToken,
    tasks: TaskTracker,
}

impl SystemContext {
    pub fn new(
        bus: EventBus,
        subscribers: SubscriberTable,
        config: Arc<SystemConfig>,
        uptime: Uptime,
    ) -> Self {
        Self {
            bus,
            subscribers,
            status: DeviceStatus::new(),
            config,
            uptime,
            shutdown: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    /// Current uptime in microseconds, for event timestamps.
    pub fn now_us(&self) -> u64 {
        self.uptime.now_us()
    }

    /// Publish with the bus timeout. `QueueFull` is logged, counted as the
    /// last error and otherwise ignored.
    pub async fn publish(&self, event: Event) -> Result<()> {
        let result = self.bus.publish(event).await;
        if let Err(e) = &result {
            warn!(kind = %event.kind, error = %e, "Event dropped");
            self.status.record_error(e);
        }
        result
    }

    /// Non-blocking publish for synchronous callers.
    pub fn try_publish(&self, event: Event) -> Result<()> {
        let result = self.bus.try_publish(event);
        if let Err(e) = &result {
            warn!(kind = %event.kind, error = %e, "Event dropped");
            self.status.record_error(e);
        }
        result
    }

    /// Register a callback for one event kind.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Result<()>
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(kind, handler)
    }

    /// Spawn a tracked task on the current runtime.
    ///
    /// # Errors
    ///
    /// `Error::TaskCreateFailed` outside a Tokio runtime or after shutdown
    /// began.
    pub fn spawn<F>(&self, name: &str, task: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.shutdown.is_cancelled() {
            return Err(Error::TaskCreateFailed(format!("{name}: shutting down")));
        }
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::TaskCreateFailed(format!("{name}: {e}")))?;
        self.tasks.spawn_on(task, &handle);
        Ok(())
    }

    /// Token cancelled when the system shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Cancel every task and wait for them to finish.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tasks.close();
        self.tasks.wait().await;
    }
}
