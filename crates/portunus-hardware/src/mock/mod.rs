//! Mock device implementations for testing and development.
//!
//! These devices can be driven programmatically without physical hardware.
//! Every mock is cheaply cloneable; clones share state, so a test keeps one
//! clone as a handle while the system owns the other.

pub mod connectivity;
pub mod gpio;

pub use connectivity::MockConnectivity;
pub use gpio::{MockDoorSensor, MockIndicator, MockResetLine, MockStrike, NoDelay};
