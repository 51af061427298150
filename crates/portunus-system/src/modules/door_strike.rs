//! Door strike with timed relock.
//!
//! `UnlockRequested(ms)` energises the strike and arms a one-shot relock
//! after `ms`. A newer unlock or an explicit `LockRequested` supersedes any
//! pending relock: every request bumps a generation counter, and a relock
//! timer only acts if the generation it was armed with is still current and
//! the strike is still unlocked.

use crate::context::SystemContext;
use crate::module::Module;
use parking_lot::Mutex;
use portunus_core::{Event, EventKind, Result};
use portunus_hardware::StrikeActuator;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct StrikeState {
    generation: u64,
    unlocked: bool,
}

/// Door strike actuator module.
pub struct DoorStrike {
    strike: Arc<dyn StrikeActuator>,
    state: Arc<Mutex<StrikeState>>,
}

impl DoorStrike {
    pub fn new(strike: Arc<dyn StrikeActuator>) -> Self {
        Self {
            strike,
            state: Arc::new(Mutex::new(StrikeState::default())),
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.state.lock().unlocked
    }

    fn unlock(&self, ms: u32, ctx: &SystemContext) {
        info!("Unlock for {} ms", ms);
        let generation = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.unlocked = true;
            self.strike.set_unlocked(true);
            state.generation
        };
        ctx.status.set_strike_unlocked(true);

        let strike = Arc::clone(&self.strike);
        let state = Arc::clone(&self.state);
        let status = ctx.status.clone();
        let shutdown = ctx.shutdown_token();
        let delay = Duration::from_millis(u64::from(ms));

        let armed = ctx.spawn("strike_relock", async move {
            // Shutdown relocks immediately.
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::time::sleep(delay) => {}
            }

            let mut state = state.lock();
            if state.generation != generation || !state.unlocked {
                debug!(generation, "Relock superseded");
                return;
            }
            info!("Relocking");
            strike.set_unlocked(false);
            state.unlocked = false;
            status.set_strike_unlocked(false);
        });

        if let Err(e) = armed {
            warn!(error = %e, "Cannot arm relock timer, locking now");
            self.lock(ctx);
        }
    }

    fn lock(&self, ctx: &SystemContext) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.unlocked = false;
        self.strike.set_unlocked(false);
        ctx.status.set_strike_unlocked(false);
    }
}

impl Module for DoorStrike {
    fn name(&self) -> &'static str {
        "door_strike"
    }

    fn initialize(&mut self) -> Result<()> {
        self.strike.set_unlocked(false);
        Ok(())
    }

    fn handle(&mut self, event: &Event, ctx: &SystemContext) {
        match event.kind {
            EventKind::UnlockRequested => {
                let ms = event
                    .unlock_ms()
                    .filter(|ms| *ms > 0)
                    .unwrap_or(ctx.config.policy.unlock_duration_ms);
                self.unlock(ms, ctx);
            }
            EventKind::LockRequested => {
                info!("LockRequested");
                self.lock(ctx);
            }
            _ => {}
        }
    }
}
