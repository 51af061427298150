//! MFRC522 card reader driver.
//!
//! The driver speaks ISO 14443A through the chip's register interface:
//!
//! 1. `REQA` as a 7-bit short frame wakes idle cards and returns the ATQA.
//! 2. Anti-collision (`SEL`, NVB `0x20`) returns four UID bytes plus BCC.
//! 3. `SELECT` (`SEL`, NVB `0x70`, UID part, BCC, CRC_A) returns the SAK.
//! 4. A leading cascade tag (`0x88`) means the UID continues at the next
//!    cascade level; 7-byte UIDs take two levels, 10-byte UIDs three.
//!
//! Every call is a complete, synchronous transaction. The driver is owned by
//! exactly one task, so all methods take `&mut self`.
//!
//! # Examples
//!
//! ```
//! use portunus_hardware::mock::NoDelay;
//! use portunus_rfid::{Mfrc522, SimulatedMfrc522};
//! use portunus_core::Uid;
//!
//! let (chip, sim) = SimulatedMfrc522::new();
//! let mut reader = Mfrc522::new(chip, NoDelay::new());
//! reader.initialize().unwrap();
//!
//! assert!(reader.read_card().unwrap_err().is_no_card());
//!
//! let uid: Uid = "04:A3:2B:11".parse().unwrap();
//! sim.present_card(uid);
//! assert_eq!(reader.read_card().unwrap(), uid);
//! ```

use crate::registers::{bcc, bits, cmd, error, init, irq, limits, picc, reg};
use portunus_core::constants::UID_MAX_LEN;
use portunus_core::{Error, Result, Uid};
use portunus_hardware::{Delay, RegisterBus, ResetLine};
use tracing::{debug, info, trace, warn};

/// MFRC522 driver over a register bus.
pub struct Mfrc522<B, D> {
    bus: B,
    delay: D,
    reset: Option<Box<dyn ResetLine>>,
}

impl<B, D> std::fmt::Debug for Mfrc522<B, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mfrc522")
            .field("reset_line", &self.reset.is_some())
            .finish_non_exhaustive()
    }
}

impl<B: RegisterBus, D: Delay> Mfrc522<B, D> {
    /// Create a driver without a hardware reset line.
    pub fn new(bus: B, delay: D) -> Self {
        Self {
            bus,
            delay,
            reset: None,
        }
    }

    /// Attach the chip's reset line, pulsed at the start of
    /// [`initialize`](Self::initialize).
    pub fn with_reset_line(mut self, line: impl ResetLine + 'static) -> Self {
        self.reset = Some(Box::new(line));
        self
    }

    /// Bring the chip up and turn the antenna on.
    ///
    /// Returns the version register value.
    ///
    /// # Errors
    ///
    /// - `Error::Timeout` if the oscillator never leaves power-down.
    /// - `Error::DeviceNotFound` if the version register reads `0x00` or `0xFF`.
    /// - `Error::BusTransfer` on bus failure.
    pub fn initialize(&mut self) -> Result<u8> {
        if let Some(line) = self.reset.as_mut() {
            line.set_level(false);
            self.delay.delay_ms(init::RESET_LOW_MS);
            line.set_level(true);
            self.delay.delay_ms(init::RESET_HIGH_MS);
        }

        self.write(reg::COMMAND, cmd::SOFT_RESET)?;
        self.delay.delay_ms(init::SOFT_RESET_SETTLE_MS);

        let mut attempts = init::POWER_DOWN_ATTEMPTS;
        while self.read(reg::COMMAND)? & cmd::POWER_DOWN != 0 {
            attempts -= 1;
            if attempts == 0 {
                return Err(Error::Timeout("reader did not leave power-down".to_string()));
            }
            self.delay.delay_ms(init::POWER_DOWN_POLL_MS);
        }

        self.write(reg::T_MODE, init::T_MODE)?;
        self.write(reg::T_PRESCALER, init::T_PRESCALER)?;
        self.write(reg::T_RELOAD_H, init::T_RELOAD_H)?;
        self.write(reg::T_RELOAD_L, init::T_RELOAD_L)?;
        self.write(reg::TX_ASK, init::TX_ASK)?;
        self.write(reg::MODE, init::MODE)?;
        self.write(reg::RF_CFG, init::RF_CFG)?;

        let version = self.version()?;
        if version == 0x00 || version == 0xFF {
            return Err(Error::DeviceNotFound { version });
        }
        info!("MFRC522 detected, version=0x{:02X}", version);

        self.antenna_on()?;
        Ok(version)
    }

    /// Read the chip version register.
    pub fn version(&mut self) -> Result<u8> {
        self.read(reg::VERSION)
    }

    /// Detect, anti-collide and select one card, returning its UID.
    ///
    /// # Errors
    ///
    /// - `Error::NoCard` when nothing answers (the idle steady state).
    /// - `Error::Collision` when the chip flags a bit collision.
    /// - `Error::ReadFailure` on malformed replies, BCC mismatch or
    ///   inconsistent cascade signalling.
    /// - `Error::Timeout` when the chip or its CRC coprocessor never finishes.
    pub fn read_card(&mut self) -> Result<Uid> {
        let atqa = self.request()?;
        trace!("ATQA: {:02X} {:02X}", atqa[0], atqa[1]);

        let mut uid = [0u8; UID_MAX_LEN];
        let mut len = 0;

        for (level, &sel) in picc::SELECT_LEVELS.iter().enumerate() {
            let (part, sak) = self.anticoll_select(sel)?;
            let tagged = part[0] == picc::CASCADE_TAG;
            let incomplete = sak & picc::SAK_CASCADE != 0;

            if tagged != incomplete {
                warn!(
                    level = level + 1,
                    sak, "Cascade tag and SAK disagree, discarding read"
                );
                return Err(Error::ReadFailure(format!(
                    "cascade tag {} but SAK 0x{sak:02X} at level {}",
                    if tagged { "present" } else { "absent" },
                    level + 1
                )));
            }

            if !tagged {
                uid[len..len + 4].copy_from_slice(&part);
                len += 4;
                return Uid::new(&uid[..len]);
            }

            if level == picc::SELECT_LEVELS.len() - 1 {
                break;
            }
            debug!("Cascade tag at level {}, continuing", level + 1);
            uid[len..len + 3].copy_from_slice(&part[1..]);
            len += 3;
        }

        Err(Error::ReadFailure(
            "cascade tag at the last cascade level".to_string(),
        ))
    }

    /// Put the selected card into HALT. Best-effort: failures are ignored.
    pub fn halt_card(&mut self) {
        let mut frame = [picc::HLTA, 0x00, 0x00, 0x00];
        match self.calculate_crc(&frame[..2]) {
            Ok(crc) => frame[2..].copy_from_slice(&crc),
            Err(e) => {
                trace!("HLTA CRC failed: {}", e);
                return;
            }
        }

        // A halted card stays silent, so the timer expiry is the expected outcome.
        if let Err(e) = self.transceive(&frame, 0, &mut []) {
            trace!("HLTA: {}", e);
        }
    }

    /// Enable both antenna drivers. No write if already on.
    pub fn antenna_on(&mut self) -> Result<()> {
        let value = self.read(reg::TX_CONTROL)?;
        if value & bits::ANTENNA != bits::ANTENNA {
            self.write(reg::TX_CONTROL, value | bits::ANTENNA)?;
        }
        Ok(())
    }

    /// Disable both antenna drivers. No write if already off.
    pub fn antenna_off(&mut self) -> Result<()> {
        let value = self.read(reg::TX_CONTROL)?;
        if value & bits::ANTENNA != 0 {
            self.write(reg::TX_CONTROL, value & !bits::ANTENNA)?;
        }
        Ok(())
    }

    /// Borrow the underlying bus.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    // ------------------------------------------------------------------------
    // Protocol steps
    // ------------------------------------------------------------------------

    fn request(&mut self) -> Result<[u8; 2]> {
        self.write(reg::BIT_FRAMING, 0x00)?;
        self.clear_bits(reg::COLL, bits::VALUES_AFTER_COLL)?;

        let mut buf = [0u8; 4];
        let n = self.transceive(&[picc::REQA], picc::SHORT_FRAME_BITS, &mut buf)?;
        if n != 2 {
            return Err(Error::ReadFailure(format!("ATQA of {n} bytes")));
        }
        Ok([buf[0], buf[1]])
    }

    /// Anti-collision and SELECT at one cascade level.
    ///
    /// Returns the four UID bytes of this level and the SAK.
    fn anticoll_select(&mut self, sel: u8) -> Result<([u8; 4], u8)> {
        let mut reply = [0u8; 5];
        let n = self.transceive(&[sel, picc::NVB_ANTICOLL], 0, &mut reply)?;
        if n != 5 {
            return Err(Error::ReadFailure(format!(
                "anti-collision reply of {n} bytes"
            )));
        }

        let part = [reply[0], reply[1], reply[2], reply[3]];
        let expected = bcc(&part);
        if expected != reply[4] {
            warn!(
                "BCC check failed: computed 0x{:02X}, received 0x{:02X}",
                expected, reply[4]
            );
            return Err(Error::ReadFailure("BCC mismatch".to_string()));
        }

        let mut frame = [0u8; 9];
        frame[0] = sel;
        frame[1] = picc::NVB_SELECT;
        frame[2..7].copy_from_slice(&reply);
        let crc = self.calculate_crc(&frame[..7])?;
        frame[7..].copy_from_slice(&crc);

        let mut sak = [0u8; 3];
        let n = self.transceive(&frame, 0, &mut sak)?;
        if n == 0 {
            return Err(Error::ReadFailure("empty SAK".to_string()));
        }
        trace!("SAK: 0x{:02X}", sak[0]);

        Ok((part, sak[0]))
    }

    /// Run `data` through the CRC coprocessor; returns `[low, high]`.
    fn calculate_crc(&mut self, data: &[u8]) -> Result<[u8; 2]> {
        self.write(reg::COMMAND, cmd::IDLE)?;
        self.write(reg::DIV_IRQ, irq::CRC)?;
        self.write(reg::FIFO_LEVEL, bits::FLUSH_BUFFER)?;
        for &byte in data {
            self.write(reg::FIFO_DATA, byte)?;
        }
        self.write(reg::COMMAND, cmd::CALC_CRC)?;

        let mut done = false;
        for _ in 0..limits::CRC_POLLS {
            if self.read(reg::DIV_IRQ)? & irq::CRC != 0 {
                done = true;
                break;
            }
        }
        if !done {
            return Err(Error::Timeout("CRC coprocessor".to_string()));
        }

        self.write(reg::COMMAND, cmd::IDLE)?;
        Ok([self.read(reg::CRC_RESULT_L)?, self.read(reg::CRC_RESULT_H)?])
    }

    /// Transmit `send` and collect the reply into `recv`.
    ///
    /// Returns the number of bytes received (truncated to `recv.len()`).
    /// Error flags take priority over the timer: a collision also stops the
    /// chip timer, and must not be reported as an empty field.
    fn transceive(&mut self, send: &[u8], tx_last_bits: u8, recv: &mut [u8]) -> Result<usize> {
        self.write(reg::COMMAND, cmd::IDLE)?;
        self.write(reg::COM_IRQ, irq::ALL)?;
        self.write(reg::FIFO_LEVEL, bits::FLUSH_BUFFER)?;
        for &byte in send {
            self.write(reg::FIFO_DATA, byte)?;
        }
        self.write(reg::BIT_FRAMING, tx_last_bits & bits::LAST_BITS)?;
        self.write(reg::COMMAND, cmd::TRANSCEIVE)?;
        self.set_bits(reg::BIT_FRAMING, bits::START_SEND)?;

        let mut status = 0;
        for _ in 0..limits::TRANSCEIVE_POLLS {
            status = self.read(reg::COM_IRQ)?;
            if status & irq::TRANSCEIVE_DONE != 0 {
                break;
            }
        }
        if status & irq::TRANSCEIVE_DONE == 0 {
            debug!("Transceive timeout");
            return Err(Error::Timeout("transceive".to_string()));
        }

        let flags = self.read(reg::ERROR)?;
        if flags & error::FAILURE_MASK != 0 {
            debug!("Transceive error: 0x{:02X}", flags);
            if flags & error::COLL != 0 {
                return Err(Error::Collision);
            }
            return Err(Error::ReadFailure(format!("error register 0x{flags:02X}")));
        }

        if status & irq::TIMER != 0 {
            return Err(Error::NoCard);
        }

        let available = usize::from(self.read(reg::FIFO_LEVEL)?);
        let n = available.min(recv.len());
        for slot in recv.iter_mut().take(n) {
            *slot = self.read(reg::FIFO_DATA)?;
        }
        Ok(n)
    }

    // ------------------------------------------------------------------------
    // Register access
    // ------------------------------------------------------------------------

    fn read(&mut self, addr: u8) -> Result<u8> {
        Ok(self.bus.read_register(addr)?)
    }

    fn write(&mut self, addr: u8, value: u8) -> Result<()> {
        Ok(self.bus.write_register(addr, value)?)
    }

    fn set_bits(&mut self, addr: u8, mask: u8) -> Result<()> {
        let value = self.read(addr)?;
        self.write(addr, value | mask)
    }

    fn clear_bits(&mut self, addr: u8, mask: u8) -> Result<()> {
        let value = self.read(addr)?;
        self.write(addr, value & !mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimFaults, SimulatedMfrc522};
    use portunus_hardware::mock::{MockResetLine, NoDelay};

    fn ready_reader() -> (Mfrc522<SimulatedMfrc522, NoDelay>, crate::sim::SimHandle) {
        let (chip, sim) = SimulatedMfrc522::new();
        let mut reader = Mfrc522::new(chip, NoDelay::new());
        reader.initialize().unwrap();
        (reader, sim)
    }

    #[test]
    fn test_initialize_pulses_reset_and_writes_config() {
        let (chip, sim) = SimulatedMfrc522::new();
        let line = MockResetLine::new();
        let delay = NoDelay::new();
        let mut reader = Mfrc522::new(chip, delay.clone()).with_reset_line(line.clone());

        let version = reader.initialize().unwrap();

        assert_eq!(version, 0x92);
        assert_eq!(line.levels(), vec![false, true]);
        assert!(delay.total_ms() >= 110);
        assert_eq!(sim.register(reg::T_MODE), 0x8D);
        assert_eq!(sim.register(reg::T_PRESCALER), 0x3E);
        assert_eq!(sim.register(reg::T_RELOAD_L), 0x1E);
        assert_eq!(sim.register(reg::TX_ASK), 0x40);
        assert_eq!(sim.register(reg::MODE), 0x3D);
        assert_eq!(sim.register(reg::RF_CFG), 0x70);
        assert_eq!(sim.register(reg::TX_CONTROL) & 0x03, 0x03);
    }

    #[test]
    fn test_initialize_rejects_missing_chip() {
        for version in [0x00, 0xFF] {
            let (chip, sim) = SimulatedMfrc522::new();
            sim.set_version(version);
            let mut reader = Mfrc522::new(chip, NoDelay::new());

            assert_eq!(
                reader.initialize().unwrap_err(),
                Error::DeviceNotFound { version }
            );
        }
    }

    #[test]
    fn test_initialize_times_out_in_power_down() {
        let (chip, sim) = SimulatedMfrc522::new();
        sim.inject(SimFaults {
            stuck_in_power_down: true,
            ..SimFaults::default()
        });
        let mut reader = Mfrc522::new(chip, NoDelay::new());

        assert!(matches!(reader.initialize(), Err(Error::Timeout(_))));
    }

    #[test]
    fn test_antenna_is_idempotent() {
        let (mut reader, sim) = ready_reader();
        let writes = sim.write_count(reg::TX_CONTROL);

        reader.antenna_on().unwrap();
        assert_eq!(sim.write_count(reg::TX_CONTROL), writes);

        reader.antenna_off().unwrap();
        reader.antenna_off().unwrap();
        assert_eq!(sim.write_count(reg::TX_CONTROL), writes + 1);
        assert_eq!(sim.register(reg::TX_CONTROL) & 0x03, 0);
    }

    #[test]
    fn test_antenna_off_means_no_card() {
        let (mut reader, sim) = ready_reader();
        sim.present_card("04:A3:2B:11".parse().unwrap());
        reader.antenna_off().unwrap();

        assert_eq!(reader.read_card().unwrap_err(), Error::NoCard);
    }

    #[test]
    fn test_halt_silences_card_until_removed() {
        let (mut reader, sim) = ready_reader();
        let uid: Uid = "04:A3:2B:11".parse().unwrap();
        sim.present_card(uid);

        assert_eq!(reader.read_card().unwrap(), uid);
        reader.halt_card();
        assert!(sim.is_halted());
        assert_eq!(reader.read_card().unwrap_err(), Error::NoCard);

        sim.remove_card();
        sim.present_card(uid);
        assert_eq!(reader.read_card().unwrap(), uid);
    }

    #[test]
    fn test_halt_frame_carries_crc() {
        let (mut reader, sim) = ready_reader();
        reader.halt_card();
        assert_eq!(sim.last_frame(), Some(vec![0x50, 0x00, 0x57, 0xCD]));
    }

    #[test]
    fn test_bus_failure_maps_to_bus_transfer() {
        let (mut reader, sim) = ready_reader();
        sim.inject(SimFaults {
            bus_failure: true,
            ..SimFaults::default()
        });

        assert!(matches!(reader.read_card(), Err(Error::BusTransfer(_))));
    }
}
