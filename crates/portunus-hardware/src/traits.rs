//! Hardware trait definitions.
//!
//! Two families live here:
//!
//! - **Transport traits** ([`RegisterBus`], [`ResetLine`], [`Delay`]) used by
//!   the card reader driver. They are synchronous: every register access is a
//!   complete request/response transaction and the driver is owned by exactly
//!   one task, so `&mut self` expresses the single in-flight transaction.
//! - **GPIO wrappers** ([`StrikeActuator`], [`StatusIndicator`],
//!   [`DoorSensor`]) and the [`Connectivity`] boundary. They are non-failing
//!   setters/getters taking `&self` so one device can be shared (via `Arc`)
//!   between a module and the timers it spawns.
//!
//! All traits are object-safe and can be used as `Box<dyn Trait>` or
//! `Arc<dyn Trait>`.

use crate::error::Result;
use std::time::Duration;

/// Register-level access to a peripheral on a synchronous serial bus.
///
/// # Examples
///
/// ```
/// use portunus_hardware::traits::RegisterBus;
/// use portunus_hardware::Result;
///
/// fn set_bits<B: RegisterBus>(bus: &mut B, reg: u8, mask: u8) -> Result<()> {
///     let value = bus.read_register(reg)?;
///     bus.write_register(reg, value | mask)
/// }
/// ```
pub trait RegisterBus: Send {
    /// Read one register.
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transfer fails.
    fn read_register(&mut self, reg: u8) -> Result<u8>;

    /// Write one register.
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transfer fails.
    fn write_register(&mut self, reg: u8, value: u8) -> Result<()>;
}

/// Hardware reset line of a peripheral (active low).
pub trait ResetLine: Send {
    /// Drive the line high (`true`) or low (`false`).
    fn set_level(&mut self, high: bool);
}

/// Blocking delay provider used during bring-up sequences.
pub trait Delay: Send {
    fn delay_ms(&mut self, ms: u32);
}

/// [`Delay`] backed by the current thread's sleep.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

/// Electric door strike.
pub trait StrikeActuator: Send + Sync {
    /// Energise (`true`) or release (`false`) the strike.
    fn set_unlocked(&self, unlocked: bool);
}

/// Single status light.
pub trait StatusIndicator: Send + Sync {
    fn set_indicator(&self, on: bool);
}

/// Binary door position sensor (reed switch).
pub trait DoorSensor: Send + Sync {
    /// Current sensor level; `true` means the door is open.
    fn door_sensor_level(&self) -> bool;
}

/// Network connectivity as seen by the endpoint.
///
/// Connection establishment and retry are owned by the network layer; the
/// endpoint only observes the current state.
pub trait Connectivity: Send + Sync {
    fn is_connected(&self) -> bool;

    /// Received signal strength in dBm, if the link reports one.
    fn signal_strength(&self) -> Option<i32> {
        None
    }
}
