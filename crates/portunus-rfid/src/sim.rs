//! Simulated MFRC522 on a virtual register bus.
//!
//! [`SimulatedMfrc522`] implements [`RegisterBus`] with the register
//! semantics the driver relies on: a 64-byte FIFO, `COM_IRQ`/`DIV_IRQ` with
//! set/clear writes, the `ERROR` register, the CRC coprocessor and the
//! Transceive command answering ISO 14443A frames from a virtual card.
//!
//! A [`SimHandle`] controls the field from the outside: present or remove a
//! card, inspect registers and transmitted frames, and inject faults.
//!
//! ```
//! use portunus_hardware::RegisterBus;
//! use portunus_rfid::SimulatedMfrc522;
//!
//! let (mut chip, sim) = SimulatedMfrc522::new();
//! assert_eq!(chip.read_register(0x37).unwrap(), 0x92);
//!
//! sim.set_version(0x00);
//! assert_eq!(chip.read_register(0x37).unwrap(), 0x00);
//! ```

use crate::registers::{bcc, bits, cmd, crc_a, error, irq, limits, picc, reg};
use parking_lot::Mutex;
use portunus_core::Uid;
use portunus_hardware::{HardwareError, RegisterBus, Result};
use std::collections::VecDeque;
use std::sync::Arc;

/// Version register value of a genuine MFRC522 v2.0.
pub const SIM_VERSION: u8 = 0x92;

/// `COMMAND` reads reporting power-down after a soft reset.
const POWER_DOWN_READS: u32 = 2;

const REGISTER_COUNT: usize = 64;

/// Faults the simulator can inject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimFaults {
    /// Anti-collision replies carry a wrong BCC.
    pub corrupt_bcc: bool,
    /// Anti-collision raises a bit collision.
    pub collision: bool,
    /// Replies raise a parity error.
    pub parity_error: bool,
    /// The CRC coprocessor never completes.
    pub crc_stall: bool,
    /// Transceive never raises an interrupt.
    pub irq_stall: bool,
    /// The card answers REQA with a one-byte ATQA.
    pub truncated_atqa: bool,
    /// The SAK cascade bit is inverted.
    pub wrong_sak: bool,
    /// The chip never leaves power-down after a soft reset.
    pub stuck_in_power_down: bool,
    /// Every bus transfer fails.
    pub bus_failure: bool,
}

#[derive(Debug, Clone, Copy)]
struct SimCard {
    uid: Uid,
    halted: bool,
}

impl SimCard {
    fn levels(&self) -> usize {
        match self.uid.len() {
            4 => 1,
            7 => 2,
            _ => 3,
        }
    }

    /// Four UID bytes transmitted at a cascade level.
    fn level_part(&self, level: usize) -> [u8; 4] {
        let uid = self.uid.as_bytes();
        let last = self.levels() - 1;
        if level < last {
            let start = level * 3;
            [picc::CASCADE_TAG, uid[start], uid[start + 1], uid[start + 2]]
        } else {
            let start = level * 3;
            [uid[start], uid[start + 1], uid[start + 2], uid[start + 3]]
        }
    }

    fn atqa(&self) -> [u8; 2] {
        match self.levels() {
            1 => [0x04, 0x00],
            2 => [0x44, 0x00],
            _ => [0x84, 0x00],
        }
    }
}

/// Outcome of one transceive on the virtual air interface.
enum Reply {
    Data(Vec<u8>),
    Silent,
    Fault(u8),
}

#[derive(Debug)]
struct SimState {
    regs: [u8; REGISTER_COUNT],
    writes: [u32; REGISTER_COUNT],
    fifo: VecDeque<u8>,
    power_down_reads: u32,
    version: u8,
    card: Option<SimCard>,
    faults: SimFaults,
    frames: Vec<Vec<u8>>,
}

impl SimState {
    fn new() -> Self {
        let mut state = Self {
            regs: [0; REGISTER_COUNT],
            writes: [0; REGISTER_COUNT],
            fifo: VecDeque::with_capacity(limits::FIFO_SIZE),
            power_down_reads: 0,
            version: SIM_VERSION,
            card: None,
            faults: SimFaults::default(),
            frames: Vec::new(),
        };
        state.reset_registers();
        state
    }

    fn reset_registers(&mut self) {
        self.regs = [0; REGISTER_COUNT];
        self.regs[usize::from(reg::COMMAND)] = 0x20;
        self.regs[usize::from(reg::TX_CONTROL)] = 0x80;
        self.regs[usize::from(reg::MODE)] = 0x3F;
        self.regs[usize::from(reg::RF_CFG)] = 0x48;
        self.fifo.clear();
    }

    fn read(&mut self, addr: u8) -> u8 {
        let index = usize::from(addr & 0x3F);
        match addr {
            reg::COMMAND => {
                if self.faults.stuck_in_power_down {
                    return self.regs[index] | cmd::POWER_DOWN;
                }
                if self.power_down_reads > 0 {
                    self.power_down_reads -= 1;
                    return self.regs[index] | cmd::POWER_DOWN;
                }
                self.regs[index]
            }
            reg::FIFO_DATA => self.fifo.pop_front().unwrap_or(0),
            reg::FIFO_LEVEL => self.fifo.len() as u8,
            reg::VERSION => self.version,
            _ => self.regs[index],
        }
    }

    fn write(&mut self, addr: u8, value: u8) {
        let index = usize::from(addr & 0x3F);
        self.writes[index] += 1;

        match addr {
            reg::COMMAND => self.execute(value & 0x0F),
            reg::COM_IRQ | reg::DIV_IRQ => {
                let marked = value & irq::ALL;
                if value & irq::SET != 0 {
                    self.regs[index] |= marked;
                } else {
                    self.regs[index] &= !marked;
                }
            }
            reg::FIFO_LEVEL => {
                if value & bits::FLUSH_BUFFER != 0 {
                    self.fifo.clear();
                    self.regs[usize::from(reg::ERROR)] &= !error::BUFFER_OVFL;
                }
            }
            reg::FIFO_DATA => {
                if self.fifo.len() < limits::FIFO_SIZE {
                    self.fifo.push_back(value);
                } else {
                    self.regs[usize::from(reg::ERROR)] |= error::BUFFER_OVFL;
                }
            }
            reg::BIT_FRAMING => {
                self.regs[index] = value & !bits::START_SEND;
                let transceiving = self.regs[usize::from(reg::COMMAND)] & 0x0F == cmd::TRANSCEIVE;
                if value & bits::START_SEND != 0 && transceiving {
                    self.transceive(value & bits::LAST_BITS);
                }
            }
            _ => self.regs[index] = value,
        }
    }

    fn execute(&mut self, command: u8) {
        let index = usize::from(reg::COMMAND);
        match command {
            cmd::SOFT_RESET => {
                self.reset_registers();
                self.power_down_reads = POWER_DOWN_READS;
            }
            cmd::CALC_CRC => {
                self.regs[index] = command;
                if !self.faults.crc_stall {
                    let data: Vec<u8> = self.fifo.drain(..).collect();
                    let [low, high] = crc_a(&data).to_le_bytes();
                    self.regs[usize::from(reg::CRC_RESULT_L)] = low;
                    self.regs[usize::from(reg::CRC_RESULT_H)] = high;
                    self.regs[usize::from(reg::DIV_IRQ)] |= irq::CRC;
                }
            }
            _ => self.regs[index] = command,
        }
    }

    fn transceive(&mut self, tx_last_bits: u8) {
        let frame: Vec<u8> = self.fifo.drain(..).collect();
        self.frames.push(frame.clone());
        self.regs[usize::from(reg::ERROR)] = 0;
        self.regs[usize::from(reg::CONTROL)] = 0;

        if self.faults.irq_stall {
            return;
        }

        let antenna_on = self.regs[usize::from(reg::TX_CONTROL)] & bits::ANTENNA == bits::ANTENNA;
        let reply = if antenna_on {
            self.answer(&frame, tx_last_bits)
        } else {
            Reply::Silent
        };

        let com_irq = usize::from(reg::COM_IRQ);
        match reply {
            Reply::Data(bytes) => {
                self.fifo.extend(bytes);
                self.regs[com_irq] |= irq::RX | irq::IDLE;
            }
            Reply::Silent => self.regs[com_irq] |= irq::TIMER | irq::IDLE,
            Reply::Fault(flags) => {
                self.regs[usize::from(reg::ERROR)] = flags;
                // The timer keeps running after a garbled reply.
                self.regs[com_irq] |= irq::ERR | irq::IDLE | irq::TIMER;
            }
        }
    }

    /// Virtual card response to one frame.
    fn answer(&mut self, frame: &[u8], tx_last_bits: u8) -> Reply {
        let faults = self.faults;
        let Some(card) = self.card.as_mut() else {
            return Reply::Silent;
        };

        match frame {
            [picc::REQA] if tx_last_bits == picc::SHORT_FRAME_BITS => {
                if card.halted {
                    return Reply::Silent;
                }
                if faults.parity_error {
                    return Reply::Fault(error::PARITY);
                }
                let atqa = card.atqa();
                if faults.truncated_atqa {
                    Reply::Data(vec![atqa[0]])
                } else {
                    Reply::Data(atqa.to_vec())
                }
            }
            [picc::WUPA] if tx_last_bits == picc::SHORT_FRAME_BITS => {
                card.halted = false;
                Reply::Data(card.atqa().to_vec())
            }
            [sel, picc::NVB_ANTICOLL] => {
                let Some(level) = select_level(*sel).filter(|l| *l < card.levels()) else {
                    return Reply::Silent;
                };
                if faults.collision {
                    return Reply::Fault(error::COLL);
                }
                let part = card.level_part(level);
                let mut check = bcc(&part);
                if faults.corrupt_bcc {
                    check ^= 0xFF;
                }
                let mut reply = part.to_vec();
                reply.push(check);
                Reply::Data(reply)
            }
            [sel, picc::NVB_SELECT, rest @ ..] if rest.len() == 7 => {
                let Some(level) = select_level(*sel).filter(|l| *l < card.levels()) else {
                    return Reply::Silent;
                };
                if crc_a(&frame[..7]).to_le_bytes() != [frame[7], frame[8]] {
                    return Reply::Silent;
                }
                let part = card.level_part(level);
                if rest[..4] != part || rest[4] != bcc(&part) {
                    return Reply::Silent;
                }

                let mut sak = if level + 1 < card.levels() {
                    picc::SAK_CASCADE
                } else {
                    0x08
                };
                if faults.wrong_sak {
                    sak ^= picc::SAK_CASCADE;
                }
                let [low, high] = crc_a(&[sak]).to_le_bytes();
                Reply::Data(vec![sak, low, high])
            }
            [picc::HLTA, 0x00, low, high] => {
                if crc_a(&[picc::HLTA, 0x00]).to_le_bytes() == [*low, *high] {
                    card.halted = true;
                }
                Reply::Silent
            }
            _ => Reply::Silent,
        }
    }
}

fn select_level(sel: u8) -> Option<usize> {
    picc::SELECT_LEVELS.iter().position(|s| *s == sel)
}

/// Simulated MFRC522 register bus.
#[derive(Debug)]
pub struct SimulatedMfrc522 {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedMfrc522 {
    /// Create a chip with an empty field and its control handle.
    pub fn new() -> (Self, SimHandle) {
        let state = Arc::new(Mutex::new(SimState::new()));
        (
            Self {
                state: Arc::clone(&state),
            },
            SimHandle { state },
        )
    }
}

impl RegisterBus for SimulatedMfrc522 {
    fn read_register(&mut self, addr: u8) -> Result<u8> {
        let mut state = self.state.lock();
        if state.faults.bus_failure {
            return Err(HardwareError::communication("simulated bus failure"));
        }
        Ok(state.read(addr))
    }

    fn write_register(&mut self, addr: u8, value: u8) -> Result<()> {
        let mut state = self.state.lock();
        if state.faults.bus_failure {
            return Err(HardwareError::communication("simulated bus failure"));
        }
        state.write(addr, value);
        Ok(())
    }
}

/// Control handle for a [`SimulatedMfrc522`].
#[derive(Debug, Clone)]
pub struct SimHandle {
    state: Arc<Mutex<SimState>>,
}

impl SimHandle {
    /// Place a card in the field, replacing any present one.
    pub fn present_card(&self, uid: Uid) {
        self.state.lock().card = Some(SimCard { uid, halted: false });
    }

    /// Take the card out of the field.
    pub fn remove_card(&self) {
        self.state.lock().card = None;
    }

    /// Whether the card in the field is halted.
    pub fn is_halted(&self) -> bool {
        self.state.lock().card.is_some_and(|c| c.halted)
    }

    pub fn set_version(&self, version: u8) {
        self.state.lock().version = version;
    }

    /// Replace the active fault set.
    pub fn inject(&self, faults: SimFaults) {
        self.state.lock().faults = faults;
    }

    /// Clear all faults.
    pub fn clear_faults(&self) {
        self.inject(SimFaults::default());
    }

    /// Current raw register value.
    pub fn register(&self, addr: u8) -> u8 {
        self.state.lock().regs[usize::from(addr & 0x3F)]
    }

    /// Number of writes a register has received.
    pub fn write_count(&self, addr: u8) -> u32 {
        self.state.lock().writes[usize::from(addr & 0x3F)]
    }

    /// Last frame transmitted to the field.
    pub fn last_frame(&self) -> Option<Vec<u8>> {
        self.state.lock().frames.last().cloned()
    }

    /// Every frame transmitted to the field.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.state.lock().frames.clone()
    }
}
