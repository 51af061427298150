//! Output pins for the demo: every level change is logged.

use portunus_hardware::{StatusIndicator, StrikeActuator};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Output pin that logs level changes under a fixed name.
#[derive(Debug)]
pub struct LoggedPin {
    name: &'static str,
    level: AtomicBool,
}

impl LoggedPin {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            level: AtomicBool::new(false),
        }
    }

    pub fn level(&self) -> bool {
        self.level.load(Ordering::SeqCst)
    }

    fn drive(&self, high: bool) {
        if self.level.swap(high, Ordering::SeqCst) != high {
            info!(pin = self.name, high, "Pin level");
        }
    }
}

impl StrikeActuator for LoggedPin {
    fn set_unlocked(&self, unlocked: bool) {
        self.drive(unlocked);
    }
}

impl StatusIndicator for LoggedPin {
    fn set_indicator(&self, on: bool) {
        self.drive(on);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_tracks_last_level() {
        let pin = LoggedPin::new("strike");
        pin.set_unlocked(true);
        pin.set_unlocked(true);
        assert!(pin.level());

        pin.set_unlocked(false);
        assert!(!pin.level());
    }
}
