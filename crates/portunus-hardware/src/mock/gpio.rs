//! Recording GPIO mocks.
//!
//! Output mocks keep a timestamped log of every level they were driven to,
//! measured on Tokio's clock so paused-time tests can assert on exact
//! switching instants.

use crate::traits::{Delay, DoorSensor, ResetLine, StatusIndicator, StrikeActuator};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::Instant;

/// Level log shared between an output mock and its clones.
#[derive(Debug, Default)]
struct LevelLog {
    level: bool,
    changes: Vec<(Instant, bool)>,
}

impl LevelLog {
    fn record(&mut self, level: bool) {
        self.level = level;
        self.changes.push((Instant::now(), level));
    }
}

/// Mock door strike recording every actuation.
///
/// # Examples
///
/// ```
/// use portunus_hardware::mock::MockStrike;
/// use portunus_hardware::traits::StrikeActuator;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let strike = MockStrike::new();
/// let handle = strike.clone();
///
/// strike.set_unlocked(true);
/// assert!(handle.is_unlocked());
/// assert_eq!(handle.levels(), vec![true]);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockStrike {
    log: Arc<Mutex<LevelLog>>,
}

impl MockStrike {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_unlocked(&self) -> bool {
        self.log.lock().level
    }

    /// Every level written, in order.
    pub fn levels(&self) -> Vec<bool> {
        self.log.lock().changes.iter().map(|(_, l)| *l).collect()
    }

    /// Every level written, with the instant it was written.
    pub fn changes(&self) -> Vec<(Instant, bool)> {
        self.log.lock().changes.clone()
    }
}

impl StrikeActuator for MockStrike {
    fn set_unlocked(&self, unlocked: bool) {
        self.log.lock().record(unlocked);
    }
}

/// Mock status light recording every level change.
#[derive(Debug, Clone, Default)]
pub struct MockIndicator {
    log: Arc<Mutex<LevelLog>>,
}

impl MockIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self) -> bool {
        self.log.lock().level
    }

    pub fn levels(&self) -> Vec<bool> {
        self.log.lock().changes.iter().map(|(_, l)| *l).collect()
    }

    pub fn changes(&self) -> Vec<(Instant, bool)> {
        self.log.lock().changes.clone()
    }

    /// Forget recorded history, keeping the current level.
    pub fn clear_history(&self) {
        self.log.lock().changes.clear();
    }
}

impl StatusIndicator for MockIndicator {
    fn set_indicator(&self, on: bool) {
        self.log.lock().record(on);
    }
}

/// Mock reed switch whose level is set by the test.
#[derive(Debug, Clone, Default)]
pub struct MockDoorSensor {
    open: Arc<AtomicBool>,
}

impl MockDoorSensor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }
}

impl DoorSensor for MockDoorSensor {
    fn door_sensor_level(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// Reset line recording the levels it was driven to.
#[derive(Debug, Clone, Default)]
pub struct MockResetLine {
    levels: Arc<Mutex<Vec<bool>>>,
}

impl MockResetLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn levels(&self) -> Vec<bool> {
        self.levels.lock().clone()
    }
}

impl ResetLine for MockResetLine {
    fn set_level(&mut self, high: bool) {
        self.levels.lock().push(high);
    }
}

/// [`Delay`] that returns immediately and remembers the requested total.
#[derive(Debug, Clone, Default)]
pub struct NoDelay {
    total_ms: Arc<Mutex<u64>>,
}

impl NoDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of every requested delay.
    pub fn total_ms(&self) -> u64 {
        *self.total_ms.lock()
    }
}

impl Delay for NoDelay {
    fn delay_ms(&mut self, ms: u32) {
        *self.total_ms.lock() += u64::from(ms);
    }
}
