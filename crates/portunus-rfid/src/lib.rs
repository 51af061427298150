//! MFRC522 contactless card reader support.
//!
//! - [`registers`]: register map, ISO 14443A constants, BCC and CRC_A.
//! - [`driver`]: the [`Mfrc522`] protocol driver.
//! - [`sim`]: a [`SimulatedMfrc522`] register bus with a virtual card field.
//! - [`poller`]: [`CardPoller`] and the presence [`Debouncer`].
//!
//! ```
//! use portunus_hardware::mock::NoDelay;
//! use portunus_rfid::{CardPoller, Mfrc522, PollOutcome, SimulatedMfrc522};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (chip, sim) = SimulatedMfrc522::new();
//! let mut reader = Mfrc522::new(chip, NoDelay::new());
//! reader.initialize().unwrap();
//!
//! let mut poller = CardPoller::new(reader, Duration::from_secs(2));
//! let now = tokio::time::Instant::now();
//! assert_eq!(poller.poll_once(now), PollOutcome::Idle);
//!
//! let uid = "04:A3:2B:11".parse().unwrap();
//! sim.present_card(uid);
//! assert_eq!(poller.poll_once(now), PollOutcome::Scanned(uid));
//! # }
//! ```

pub mod driver;
pub mod poller;
pub mod registers;
pub mod sim;

pub use driver::Mfrc522;
pub use poller::{CardPoller, Debouncer, PollOutcome};
pub use sim::{SimFaults, SimHandle, SimulatedMfrc522};
