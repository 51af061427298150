//! Status light feedback patterns.
//!
//! | Feedback | Pattern |
//! |----------|---------|
//! | `Armed` | steady on |
//! | `Online` | 2 x 80/80 ms |
//! | `Offline` | steady off |
//! | `AccessGranted` | 3 x 60/60 ms |
//! | `AccessDenied` | 1 x 200/80 ms |
//! | `Error` | 5 x 40/40 ms |
//!
//! Each feedback supersedes the previous pattern. A running blink loop
//! checks its generation before every level change and stops as soon as a
//! newer pattern has been requested.

use crate::context::SystemContext;
use crate::module::Module;
use parking_lot::Mutex;
use portunus_core::{Event, EventKind, FeedbackKind, Result};
use portunus_hardware::StatusIndicator;
use std::sync::Arc;
use std::time::Duration;
use tracing::{trace, warn};

/// Light pattern for one feedback kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedPattern {
    Steady(bool),
    Blink {
        pulses: u32,
        on: Duration,
        off: Duration,
    },
}

impl LedPattern {
    const fn blink(pulses: u32, on_ms: u64, off_ms: u64) -> Self {
        Self::Blink {
            pulses,
            on: Duration::from_millis(on_ms),
            off: Duration::from_millis(off_ms),
        }
    }

    pub fn for_feedback(kind: FeedbackKind) -> Self {
        match kind {
            FeedbackKind::Armed => Self::Steady(true),
            FeedbackKind::Online => Self::blink(2, 80, 80),
            FeedbackKind::Offline => Self::Steady(false),
            FeedbackKind::AccessGranted => Self::blink(3, 60, 60),
            FeedbackKind::AccessDenied => Self::blink(1, 200, 80),
            FeedbackKind::Error => Self::blink(5, 40, 40),
        }
    }
}

/// Light plus the generation of the pattern allowed to drive it.
struct Owner {
    led: Arc<dyn StatusIndicator>,
    generation: Mutex<u64>,
}

impl Owner {
    /// Drive the light if `generation` is still current.
    fn set_if_current(&self, generation: u64, on: bool) -> bool {
        let current = self.generation.lock();
        if *current != generation {
            return false;
        }
        self.led.set_indicator(on);
        true
    }
}

/// Status indicator module.
pub struct StatusLed {
    owner: Arc<Owner>,
}

impl StatusLed {
    pub fn new(led: Arc<dyn StatusIndicator>) -> Self {
        Self {
            owner: Arc::new(Owner {
                led,
                generation: Mutex::new(0),
            }),
        }
    }

    fn show(&self, pattern: LedPattern, ctx: &SystemContext) {
        let generation = {
            let mut current = self.owner.generation.lock();
            *current += 1;
            *current
        };
        trace!(?pattern, generation, "Status pattern");

        match pattern {
            LedPattern::Steady(on) => {
                self.owner.set_if_current(generation, on);
            }
            LedPattern::Blink { pulses, on, off } => {
                let owner = Arc::clone(&self.owner);
                let spawned = ctx.spawn("led_blink", async move {
                    for _ in 0..pulses {
                        if !owner.set_if_current(generation, true) {
                            return;
                        }
                        tokio::time::sleep(on).await;
                        if !owner.set_if_current(generation, false) {
                            return;
                        }
                        tokio::time::sleep(off).await;
                    }
                });
                if let Err(e) = spawned {
                    warn!(error = %e, "Blink task not started");
                }
            }
        }
    }
}

impl Module for StatusLed {
    fn name(&self) -> &'static str {
        "status_led"
    }

    fn initialize(&mut self) -> Result<()> {
        self.owner.led.set_indicator(false);
        Ok(())
    }

    fn handle(&mut self, event: &Event, ctx: &SystemContext) {
        if event.kind != EventKind::Feedback {
            return;
        }
        let kind = event.feedback_kind().unwrap_or(FeedbackKind::Error);
        self.show(LedPattern::for_feedback(kind), ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns() {
        assert_eq!(
            LedPattern::for_feedback(FeedbackKind::Armed),
            LedPattern::Steady(true)
        );
        assert_eq!(
            LedPattern::for_feedback(FeedbackKind::AccessDenied),
            LedPattern::Blink {
                pulses: 1,
                on: Duration::from_millis(200),
                off: Duration::from_millis(80),
            }
        );
        assert!(matches!(
            LedPattern::for_feedback(FeedbackKind::Error),
            LedPattern::Blink { pulses: 5, .. }
        ));
    }
}
