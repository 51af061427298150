//! Mock network link.

use crate::traits::Connectivity;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Default)]
struct LinkState {
    connected: bool,
    rssi: Option<i32>,
}

/// Network link whose state is set by the test.
///
/// # Examples
///
/// ```
/// use portunus_hardware::mock::MockConnectivity;
/// use portunus_hardware::traits::Connectivity;
///
/// let link = MockConnectivity::new();
/// assert!(!link.is_connected());
///
/// link.connect(-61);
/// assert!(link.is_connected());
/// assert_eq!(link.signal_strength(), Some(-61));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockConnectivity {
    state: Arc<Mutex<LinkState>>,
}

impl MockConnectivity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the link up with the given signal strength (dBm).
    pub fn connect(&self, rssi: i32) {
        let mut state = self.state.lock();
        state.connected = true;
        state.rssi = Some(rssi);
    }

    /// Drop the link.
    pub fn disconnect(&self) {
        let mut state = self.state.lock();
        state.connected = false;
        state.rssi = None;
    }
}

impl Connectivity for MockConnectivity {
    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    fn signal_strength(&self) -> Option<i32> {
        self.state.lock().rssi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnect_clears_signal() {
        let link = MockConnectivity::new();
        link.connect(-70);
        link.disconnect();

        assert!(!link.is_connected());
        assert_eq!(link.signal_strength(), None);
    }
}
