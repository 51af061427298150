//! Reactive modules.
//!
//! Each module owns one physical concern and reacts to bus events:
//!
//! - [`DoorStrike`]: unlock with a timed relock.
//! - [`StatusLed`]: feedback patterns on the status light.
//! - [`DoorSensorMonitor`]: door open/closed transitions.
//! - [`CardReader`]: owns the card reader and its poll task.
//! - [`ConnectivityMonitor`]: network up/down transitions.
//! - [`Reporter`]: heartbeats and event records for the remote service.

pub mod card_reader;
pub mod connectivity;
pub mod door_sensor;
pub mod door_strike;
pub mod reporter;
pub mod status_led;

pub use card_reader::CardReader;
pub use connectivity::ConnectivityMonitor;
pub use door_sensor::DoorSensorMonitor;
pub use door_strike::DoorStrike;
pub use reporter::Reporter;
pub use status_led::{LedPattern, StatusLed};
