//! Device status snapshot shared between tasks.
//!
//! Several tasks write individual fields (strike, door sensor, connectivity,
//! card poller); the heartbeat reads the whole record. The mutex is held
//! only for one field access or one copy.

use parking_lot::Mutex;
use portunus_core::Error;
use serde::Serialize;
use std::sync::Arc;

/// Point-in-time copy of the device status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeviceSnapshot {
    pub strike_unlocked: bool,
    pub door_open: bool,
    /// Signal strength in dBm while connected.
    pub signal_strength: Option<i32>,
    /// Code of the most recent error, 0 if none.
    pub last_error: u32,
}

/// Shared, lock-protected device status.
#[derive(Debug, Clone, Default)]
pub struct DeviceStatus {
    inner: Arc<Mutex<DeviceSnapshot>>,
}

impl DeviceStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_strike_unlocked(&self, unlocked: bool) {
        self.inner.lock().strike_unlocked = unlocked;
    }

    pub fn set_door_open(&self, open: bool) {
        self.inner.lock().door_open = open;
    }

    pub fn set_signal_strength(&self, rssi: Option<i32>) {
        self.inner.lock().signal_strength = rssi;
    }

    /// Record `error` as the last error.
    pub fn record_error(&self, error: &Error) {
        self.inner.lock().last_error = error.code();
    }

    pub fn clear_error(&self) {
        self.inner.lock().last_error = 0;
    }

    /// Atomic copy of every field.
    pub fn snapshot(&self) -> DeviceSnapshot {
        *self.inner.lock()
    }
}
