//! MFRC522 register map and ISO 14443A protocol constants.
//!
//! Only the registers and bits the driver touches are listed. Addresses are
//! the 6-bit register numbers from the MFRC522 datasheet; the SPI address
//! byte framing is the bus implementation's concern.

// ============================================================================
// Registers
// ============================================================================

/// Register addresses.
pub mod reg {
    pub const COMMAND: u8 = 0x01;
    pub const COM_IRQ: u8 = 0x04;
    pub const DIV_IRQ: u8 = 0x05;
    pub const ERROR: u8 = 0x06;
    pub const FIFO_DATA: u8 = 0x09;
    pub const FIFO_LEVEL: u8 = 0x0A;
    pub const CONTROL: u8 = 0x0C;
    pub const BIT_FRAMING: u8 = 0x0D;
    pub const COLL: u8 = 0x0E;
    pub const MODE: u8 = 0x11;
    pub const TX_CONTROL: u8 = 0x14;
    pub const TX_ASK: u8 = 0x15;
    pub const CRC_RESULT_H: u8 = 0x21;
    pub const CRC_RESULT_L: u8 = 0x22;
    pub const RF_CFG: u8 = 0x26;
    pub const T_MODE: u8 = 0x2A;
    pub const T_PRESCALER: u8 = 0x2B;
    pub const T_RELOAD_H: u8 = 0x2C;
    pub const T_RELOAD_L: u8 = 0x2D;
    pub const VERSION: u8 = 0x37;
}

/// Chip commands written to `COMMAND`.
pub mod cmd {
    pub const IDLE: u8 = 0x00;
    pub const CALC_CRC: u8 = 0x03;
    pub const TRANSCEIVE: u8 = 0x0C;
    pub const SOFT_RESET: u8 = 0x0F;

    /// `COMMAND` bit set while the analog part is powered down.
    pub const POWER_DOWN: u8 = 0x10;
}

/// `COM_IRQ` bits.
pub mod irq {
    /// Bit 7 of an IRQ register write: set (1) or clear (0) the marked bits.
    pub const SET: u8 = 0x80;
    pub const ALL: u8 = 0x7F;
    pub const RX: u8 = 0x20;
    pub const IDLE: u8 = 0x10;
    pub const ERR: u8 = 0x02;
    pub const TIMER: u8 = 0x01;

    /// `DIV_IRQ` bit raised when the CRC coprocessor finishes.
    pub const CRC: u8 = 0x04;

    /// Any of these ends a transceive.
    pub const TRANSCEIVE_DONE: u8 = RX | IDLE | ERR | TIMER;
}

/// `ERROR` register bits.
pub mod error {
    pub const BUFFER_OVFL: u8 = 0x10;
    pub const COLL: u8 = 0x08;
    pub const PARITY: u8 = 0x02;
    pub const PROTOCOL: u8 = 0x01;

    /// Flags that fail a transceive.
    pub const FAILURE_MASK: u8 = BUFFER_OVFL | COLL | PARITY | PROTOCOL;
}

/// Miscellaneous register bits.
pub mod bits {
    /// `FIFO_LEVEL` write: flush the FIFO.
    pub const FLUSH_BUFFER: u8 = 0x80;
    /// `BIT_FRAMING`: start transmission of FIFO contents.
    pub const START_SEND: u8 = 0x80;
    /// `BIT_FRAMING` / `CONTROL`: number of valid bits in the last byte.
    pub const LAST_BITS: u8 = 0x07;
    /// `COLL`: received bits after a collision are cleared.
    pub const VALUES_AFTER_COLL: u8 = 0x80;
    /// `TX_CONTROL`: Tx1RFEn | Tx2RFEn.
    pub const ANTENNA: u8 = 0x03;
}

/// Register values written during bring-up.
pub mod init {
    /// TAuto=1, TPrescaler high nibble 0x0D.
    pub const T_MODE: u8 = 0x8D;
    pub const T_PRESCALER: u8 = 0x3E;
    /// Reload 0x001E, roughly 25 ms with the prescaler above.
    pub const T_RELOAD_H: u8 = 0x00;
    pub const T_RELOAD_L: u8 = 0x1E;
    /// Force 100% ASK modulation.
    pub const TX_ASK: u8 = 0x40;
    /// CRC coprocessor preset 0x6363.
    pub const MODE: u8 = 0x3D;
    /// Receiver gain 48 dB.
    pub const RF_CFG: u8 = 0x70;

    pub const RESET_LOW_MS: u32 = 10;
    pub const RESET_HIGH_MS: u32 = 50;
    pub const SOFT_RESET_SETTLE_MS: u32 = 50;
    pub const POWER_DOWN_POLL_MS: u32 = 10;
    pub const POWER_DOWN_ATTEMPTS: u32 = 100;
}

/// Bounded busy-poll limits.
pub mod limits {
    pub const TRANSCEIVE_POLLS: u32 = 2000;
    pub const CRC_POLLS: u32 = 5000;
    /// FIFO capacity in bytes.
    pub const FIFO_SIZE: usize = 64;
}

// ============================================================================
// ISO 14443A
// ============================================================================

/// Card (PICC) commands.
pub mod picc {
    pub const REQA: u8 = 0x26;
    pub const WUPA: u8 = 0x52;
    pub const SEL_CL1: u8 = 0x93;
    pub const SEL_CL2: u8 = 0x95;
    pub const SEL_CL3: u8 = 0x97;
    pub const HLTA: u8 = 0x50;

    /// First byte of a cascade level whose UID continues at the next level.
    pub const CASCADE_TAG: u8 = 0x88;

    /// NVB for anti-collision: SEL + NVB only.
    pub const NVB_ANTICOLL: u8 = 0x20;
    /// NVB for SELECT: 7 complete bytes.
    pub const NVB_SELECT: u8 = 0x70;

    /// SAK bit meaning "UID not complete".
    pub const SAK_CASCADE: u8 = 0x04;

    /// REQA/WUPA are 7-bit short frames.
    pub const SHORT_FRAME_BITS: u8 = 7;

    /// Select commands in cascade order.
    pub const SELECT_LEVELS: [u8; 3] = [SEL_CL1, SEL_CL2, SEL_CL3];
}

/// Block check character over the four UID bytes of one cascade level.
pub fn bcc(part: &[u8; 4]) -> u8 {
    part.iter().fold(0, |acc, b| acc ^ b)
}

/// ISO 14443A CRC_A (preset 0x6363, reflected polynomial 0x8408).
///
/// The chip computes this in its coprocessor; this software version is used
/// by the simulator and in tests.
///
/// ```
/// use portunus_rfid::registers::crc_a;
///
/// // HLTA frame
/// assert_eq!(crc_a(&[0x50, 0x00]), 0xCD57);
/// ```
pub fn crc_a(data: &[u8]) -> u16 {
    let mut crc: u16 = 0x6363;
    for &byte in data {
        let mut b = byte ^ (crc & 0x00FF) as u8;
        b ^= b << 4;
        crc = (crc >> 8) ^ (u16::from(b) << 8) ^ (u16::from(b) << 3) ^ (u16::from(b) >> 4);
    }
    crc
}
