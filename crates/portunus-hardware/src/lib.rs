//! Hardware abstraction layer for the Portunus door access endpoint.
//!
//! This crate defines the boundary between the access logic and the physical
//! world:
//!
//! - [`RegisterBus`], [`ResetLine`] and [`Delay`]: the transport the card
//!   reader driver talks through.
//! - [`StrikeActuator`], [`StatusIndicator`], [`DoorSensor`]: GPIO wrappers
//!   whose only job is setting or sampling a pin level.
//! - [`Connectivity`]: the network link as observed by the endpoint.
//! - [`Uptime`]: the monotonic clock every timestamp is taken from.
//!
//! # Example
//!
//! ```
//! use portunus_hardware::mock::{MockDoorSensor, MockStrike};
//! use portunus_hardware::{DoorSensor, StrikeActuator};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let strike: Arc<dyn StrikeActuator> = Arc::new(MockStrike::new());
//! let sensor: Arc<dyn DoorSensor> = Arc::new(MockDoorSensor::new());
//!
//! if !sensor.door_sensor_level() {
//!     strike.set_unlocked(true);
//! }
//! # }
//! ```
//!
//! # Mock Implementations
//!
//! The [`mock`] module provides recording implementations of every trait for
//! development and tests. A register-accurate card reader simulator lives in
//! `portunus-rfid`.

pub mod clock;
pub mod error;
pub mod mock;
pub mod traits;

pub use clock::Uptime;
pub use error::{HardwareError, Result};
pub use traits::{
    Connectivity, Delay, DoorSensor, RegisterBus, ResetLine, StatusIndicator, StrikeActuator,
    ThreadDelay,
};
