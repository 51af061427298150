//! Top-level orchestrator.
//!
//! Owns the bring-up sequence and the single bus consumer:
//!
//! ```text
//! producers ──► EventBus ──► consumer task
//!                              │ 1. PolicyMachine::on_event ──► derived events back onto the bus
//!                              │ 2. ModuleRegistry::dispatch
//!                              └ 3. SubscriberTable fan-out
//! ```
//!
//! Bring-up validates the configuration, creates the bus and the shared
//! context, queues `Boot`, then initializes and starts every module and
//! spawns the consumer. `Boot` is queued before any producer task exists,
//! so it is always the first event the consumer sees. A fatal failure on the way leaves the runtime
//! in [`RuntimeState::Failed`] with every task already spawned cancelled.
//!
//! # Examples
//!
//! ```
//! use portunus_core::SystemConfig;
//! use portunus_system::{Runtime, RuntimeState};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut runtime = Runtime::new(SystemConfig::default());
//! runtime.start().await.unwrap();
//! assert_eq!(*runtime.state(), RuntimeState::Running);
//!
//! runtime.shutdown().await;
//! assert_eq!(*runtime.state(), RuntimeState::Stopped);
//! # }
//! ```

use crate::bus::EventBus;
use crate::context::SystemContext;
use crate::dispatch::{Dispatcher, SubscriberTable};
use crate::module::Module;
use crate::policy::{PolicyMachine, PolicyState};
use crate::registry::ModuleRegistry;
use portunus_core::{Error, Event, Result, SystemConfig};
use portunus_hardware::Uptime;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, trace};

/// Lifecycle of a [`Runtime`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeState {
    /// Modules may still be registered.
    Created,
    Running,
    /// Bring-up hit a fatal error; nothing is running.
    Failed(Error),
    Stopped,
}

impl fmt::Display for RuntimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeState::Created => f.write_str("Created"),
            RuntimeState::Running => f.write_str("Running"),
            RuntimeState::Failed(e) => write!(f, "Failed ({e})"),
            RuntimeState::Stopped => f.write_str("Stopped"),
        }
    }
}

/// Builds and runs the access endpoint.
pub struct Runtime {
    config: Arc<SystemConfig>,
    registry: Option<ModuleRegistry>,
    context: Option<SystemContext>,
    state: RuntimeState,
    policy_tx: watch::Sender<PolicyState>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("state", &self.state)
            .field("modules", &self.registry)
            .finish()
    }
}

impl Runtime {
    pub fn new(config: SystemConfig) -> Self {
        let (policy_tx, _) = watch::channel(PolicyState::Boot);
        Self {
            config: Arc::new(config),
            registry: Some(ModuleRegistry::new()),
            context: None,
            state: RuntimeState::Created,
            policy_tx,
        }
    }

    /// Add a module. Modules receive events in registration order.
    ///
    /// # Errors
    ///
    /// - `Error::AlreadyInitialized` once [`start`](Self::start) was called.
    /// - `Error::InvalidArgument` when the registry is full.
    pub fn register(&mut self, module: Box<dyn Module>) -> Result<()> {
        match (&self.state, self.registry.as_mut()) {
            (RuntimeState::Created, Some(registry)) => registry.register(module),
            _ => Err(Error::AlreadyInitialized("runtime".to_string())),
        }
    }

    pub fn state(&self) -> &RuntimeState {
        &self.state
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Shared context, available once running.
    pub fn context(&self) -> Option<&SystemContext> {
        self.context.as_ref()
    }

    /// Follow the policy state as the consumer updates it.
    pub fn policy_state(&self) -> watch::Receiver<PolicyState> {
        self.policy_tx.subscribe()
    }

    /// Bring the system up. `Boot` is the first event on the bus.
    ///
    /// # Errors
    ///
    /// - `Error::AlreadyInitialized` unless the runtime is freshly created.
    /// - Any error that is fatal at startup (`QueueCreateFailed`,
    ///   `TaskCreateFailed`, `InvalidArgument`). The runtime is then in
    ///   [`RuntimeState::Failed`].
    pub async fn start(&mut self) -> Result<()> {
        if self.state != RuntimeState::Created {
            return Err(Error::AlreadyInitialized("runtime".to_string()));
        }

        info!(version = portunus_core::VERSION, "Starting access endpoint");
        match self.bring_up().await {
            Ok(ctx) => {
                self.context = Some(ctx.clone());
                self.state = RuntimeState::Running;
                info!("System running");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, code = e.code(), "System halted during bring-up");
                self.state = RuntimeState::Failed(e.clone());
                Err(e)
            }
        }
    }

    async fn bring_up(&mut self) -> Result<SystemContext> {
        self.config.validate()?;

        let mut registry = self
            .registry
            .take()
            .ok_or_else(|| Error::NotInitialized("module registry".to_string()))?;

        let (bus, rx) = EventBus::new(self.config.bus.queue_length, self.config.bus.publish_timeout())?;
        let subscribers = SubscriberTable::new(self.config.bus.max_subscribers);
        let ctx = SystemContext::new(
            bus,
            subscribers.clone(),
            Arc::clone(&self.config),
            Uptime::start(),
        );

        // Modules started below may publish from their first tick.
        ctx.try_publish(Event::boot(ctx.now_us()))?;

        // Chip bring-up sleeps on the calling thread.
        let (mut registry, initialized) = tokio::task::spawn_blocking(move || {
            let result = registry.initialize_all();
            (registry, result)
        })
        .await
        .map_err(|e| Error::TaskCreateFailed(format!("module initialization: {e}")))?;
        initialized?;

        let spawned = registry.start_all(&ctx).and_then(|()| {
            let consumer = Consumer {
                dispatcher: Dispatcher::new(rx, subscribers),
                registry,
                policy: PolicyMachine::new(self.config.policy.unlock_duration_ms),
                policy_tx: self.policy_tx.clone(),
                ctx: ctx.clone(),
            };
            ctx.spawn("policy_dispatch", consumer.run())
        });

        if let Err(e) = spawned {
            // Tasks of modules started before the failure.
            ctx.shutdown().await;
            return Err(e);
        }
        Ok(ctx)
    }

    /// Cancel every task and wait for them to finish.
    pub async fn shutdown(&mut self) {
        if let Some(ctx) = self.context.take() {
            info!("Shutting down");
            ctx.shutdown().await;
            self.state = RuntimeState::Stopped;
            info!("Shutdown complete");
        }
    }
}

/// State owned by the consumer task.
struct Consumer {
    dispatcher: Dispatcher,
    registry: ModuleRegistry,
    policy: PolicyMachine,
    policy_tx: watch::Sender<PolicyState>,
    ctx: SystemContext,
}

impl Consumer {
    async fn run(mut self) {
        let cancel = self.ctx.shutdown_token();
        info!(modules = ?self.registry.names(), "Consumer started");

        while let Some(event) = self.dispatcher.next(&cancel).await {
            trace!(kind = %event.kind, ts = event.timestamp_us, "Dequeued");

            // The consumer is the bus's only reader, so waiting for space
            // here could never succeed.
            for derived in self.policy.on_event(&event, self.ctx.now_us()) {
                let _ = self.ctx.try_publish(derived);
            }
            self.policy_tx.send_replace(self.policy.state());

            self.registry.dispatch(&event, &self.ctx);
            self.dispatcher.fan_out(&event);
        }
        debug!("Consumer stopped");
    }
}
