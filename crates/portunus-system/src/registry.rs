//! Ordered collection of modules.

use crate::context::SystemContext;
use crate::module::Module;
use portunus_core::{Error, Event, Result, constants::MAX_MODULES};
use tracing::{error, info, warn};

struct Entry {
    module: Box<dyn Module>,
    enabled: bool,
}

/// Modules in registration order, owned for the life of the system.
///
/// A module whose `initialize` or `start` fails with an error that is not
/// fatal at startup (for example a missing card reader) is disabled: it is
/// not started and receives no events, and the rest of the system carries
/// on in degraded operation.
#[derive(Default)]
pub struct ModuleRegistry {
    entries: Vec<Entry>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a module.
    ///
    /// # Errors
    ///
    /// `Error::InvalidArgument` when the registry already holds
    /// `MAX_MODULES` modules.
    pub fn register(&mut self, module: Box<dyn Module>) -> Result<()> {
        if self.entries.len() >= MAX_MODULES {
            return Err(Error::InvalidArgument(format!(
                "module registry full ({MAX_MODULES}), cannot add {}",
                module.name()
            )));
        }
        self.entries.push(Entry {
            module,
            enabled: true,
        });
        Ok(())
    }

    /// Initialize every module in order.
    ///
    /// # Errors
    ///
    /// The first error for which [`Error::is_fatal_at_startup`] holds. Later
    /// modules are not initialized.
    pub fn initialize_all(&mut self) -> Result<()> {
        for entry in &mut self.entries {
            let name = entry.module.name();
            match entry.module.initialize() {
                Ok(()) => info!(module = name, "Module initialized"),
                Err(e) if e.is_fatal_at_startup() => {
                    error!(module = name, error = %e, "Module initialization failed");
                    return Err(e);
                }
                Err(e) => {
                    warn!(module = name, error = %e, "Module disabled");
                    entry.enabled = false;
                }
            }
        }
        Ok(())
    }

    /// Start every enabled module in order.
    ///
    /// # Errors
    ///
    /// The first error for which [`Error::is_fatal_at_startup`] holds.
    pub fn start_all(&mut self, ctx: &SystemContext) -> Result<()> {
        for entry in self.entries.iter_mut().filter(|e| e.enabled) {
            let name = entry.module.name();
            match entry.module.start(ctx) {
                Ok(()) => {}
                Err(e) if e.is_fatal_at_startup() => {
                    error!(module = name, error = %e, "Module start failed");
                    return Err(e);
                }
                Err(e) => {
                    warn!(module = name, error = %e, "Module disabled");
                    entry.enabled = false;
                }
            }
        }
        Ok(())
    }

    /// Hand `event` to every enabled module in order.
    pub fn dispatch(&mut self, event: &Event, ctx: &SystemContext) {
        for entry in self.entries.iter_mut().filter(|e| e.enabled) {
            entry.module.handle(event, ctx);
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.module.name()).collect()
    }

    /// Modules switched off by a non-fatal bring-up failure.
    pub fn disabled(&self) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|e| !e.enabled)
            .map(|e| e.module.name())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
