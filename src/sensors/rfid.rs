//! MFRC522 card reader on the shared I2C bus.
//!
//! Only the two commands needed to read a card serial are implemented:
//! REQA (is a card in the field?) followed by a cascade-level-1
//! anticollision which returns the 4-byte UID plus its BCC check byte.
//!
//! The driver does not own the bus; callers pass it per transaction so the
//! LCD backpack can share the same I2C peripheral.

use embedded_hal::i2c::I2c;

use crate::error::SensorError;

/// Card identifier as published on the wire, e.g. `0x12345678`.
pub type CardId = heapless::String<16>;

/// Render a UID as `0x` followed by two lowercase hex digits per byte.
/// UIDs longer than seven bytes are truncated to fit [`CardId`].
pub fn format_uid(uid: &[u8]) -> CardId {
    use core::fmt::Write;

    let mut out = CardId::new();
    let _ = out.push_str("0x");
    for b in uid.iter().take(7) {
        let _ = write!(out, "{:02x}", b);
    }
    out
}

// ── Registers / commands ──────────────────────────────────────

const COMMAND_REG: u8 = 0x01;
const COMM_IEN_REG: u8 = 0x02;
const COMM_IRQ_REG: u8 = 0x04;
const ERROR_REG: u8 = 0x06;
const FIFO_DATA_REG: u8 = 0x09;
const FIFO_LEVEL_REG: u8 = 0x0A;
const CONTROL_REG: u8 = 0x0C;
const BIT_FRAMING_REG: u8 = 0x0D;
const MODE_REG: u8 = 0x11;
const TX_CONTROL_REG: u8 = 0x14;
const TX_AUTO_REG: u8 = 0x15;
const RF_CFG_REG: u8 = 0x26;
const T_MODE_REG: u8 = 0x2A;
const T_PRESCALER_REG: u8 = 0x2B;
const T_RELOAD_REG_H: u8 = 0x2C;
const T_RELOAD_REG_L: u8 = 0x2D;

const PCD_IDLE: u8 = 0x00;
const PCD_TRANSCEIVE: u8 = 0x0C;
const PCD_RESET: u8 = 0x0F;

const PICC_REQIDL: u8 = 0x26;
const PICC_ANTICOLL: u8 = 0x93;

/// RxIRq | IdleIRq
const IRQ_WAIT: u8 = 0x30;
const TIMER_IRQ: u8 = 0x01;
/// BufferOvfl | ParityErr | ProtocolErr | CollErr
const ERROR_MASK: u8 = 0x1B;
const POLL_LIMIT: u16 = 2000;

/// A transceive exchange that completed without an RF error.
struct Response {
    data: heapless::Vec<u8, 16>,
    bits: usize,
}

pub struct Mfrc522 {
    addr: u8,
    initialised: bool,
}

impl Mfrc522 {
    pub fn new(addr: u8) -> Self {
        Self {
            addr,
            initialised: false,
        }
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    /// Soft-reset the chip, configure its timer and enable the antenna.
    pub fn init<I: I2c>(&mut self, bus: &mut I) -> Result<(), SensorError> {
        self.write(bus, COMMAND_REG, PCD_RESET)?;
        // ~25 ms timeout: TPrescaler 0xD3E at 13.56 MHz, reload 30
        self.write(bus, T_MODE_REG, 0x8D)?;
        self.write(bus, T_PRESCALER_REG, 0x3E)?;
        self.write(bus, T_RELOAD_REG_L, 30)?;
        self.write(bus, T_RELOAD_REG_H, 0)?;
        self.write(bus, TX_AUTO_REG, 0x40)?;
        self.write(bus, MODE_REG, 0x3D)?;
        // 48 dB receiver gain
        self.write(bus, RF_CFG_REG, 0x70)?;
        let tx = self.read(bus, TX_CONTROL_REG)?;
        self.write(bus, TX_CONTROL_REG, tx | 0x03)?;
        self.initialised = true;
        Ok(())
    }

    /// Look for a card in the field.
    ///
    /// `Ok(None)` means no card answered. A card that answered with a
    /// corrupted serial yields `Err(ChecksumMismatch)`.
    pub fn scan<I: I2c>(&mut self, bus: &mut I) -> Result<Option<CardId>, SensorError> {
        if !self.initialised {
            self.init(bus)?;
        }

        // REQA is a short frame: 7 bits.
        self.write(bus, BIT_FRAMING_REG, 0x07)?;
        match self.transceive(bus, &[PICC_REQIDL])? {
            Some(resp) if resp.bits == 0x10 => {}
            _ => return Ok(None),
        }

        self.write(bus, BIT_FRAMING_REG, 0x00)?;
        let Some(resp) = self.transceive(bus, &[PICC_ANTICOLL, 0x20])? else {
            return Ok(None);
        };
        if resp.data.len() != 5 {
            return Ok(None);
        }
        let bcc = resp.data[..4].iter().fold(0u8, |acc, b| acc ^ b);
        if bcc != resp.data[4] {
            return Err(SensorError::ChecksumMismatch);
        }
        Ok(Some(format_uid(&resp.data[..4])))
    }

    fn transceive<I: I2c>(&self, bus: &mut I, data: &[u8]) -> Result<Option<Response>, SensorError> {
        self.write(bus, COMM_IEN_REG, 0x77 | 0x80)?;
        self.write(bus, COMM_IRQ_REG, 0x7F)?;
        // Flush FIFO
        self.write(bus, FIFO_LEVEL_REG, 0x80)?;
        for &b in data {
            self.write(bus, FIFO_DATA_REG, b)?;
        }
        self.write(bus, COMMAND_REG, PCD_TRANSCEIVE)?;
        let framing = self.read(bus, BIT_FRAMING_REG)?;
        self.write(bus, BIT_FRAMING_REG, framing | 0x80)?;

        let mut completed = false;
        for _ in 0..POLL_LIMIT {
            let irq = self.read(bus, COMM_IRQ_REG)?;
            if irq & IRQ_WAIT != 0 {
                completed = true;
                break;
            }
            if irq & TIMER_IRQ != 0 {
                break;
            }
        }
        self.write(bus, BIT_FRAMING_REG, 0x00)?;
        self.write(bus, COMMAND_REG, PCD_IDLE)?;

        if !completed || self.read(bus, ERROR_REG)? & ERROR_MASK != 0 {
            return Ok(None);
        }

        let level = usize::from(self.read(bus, FIFO_LEVEL_REG)?);
        let last_bits = usize::from(self.read(bus, CONTROL_REG)? & 0x07);
        let bits = if last_bits != 0 {
            level.saturating_sub(1) * 8 + last_bits
        } else {
            level * 8
        };

        let mut out = heapless::Vec::new();
        for _ in 0..level.clamp(1, 16) {
            let _ = out.push(self.read(bus, FIFO_DATA_REG)?);
        }
        Ok(Some(Response { data: out, bits }))
    }

    fn write<I: I2c>(&self, bus: &mut I, reg: u8, val: u8) -> Result<(), SensorError> {
        bus.write(self.addr, &[reg, val])
            .map_err(|_| SensorError::BusReadFailed)
    }

    fn read<I: I2c>(&self, bus: &mut I, reg: u8) -> Result<u8, SensorError> {
        let mut buf = [0u8; 1];
        bus.write_read(self.addr, &[reg], &mut buf)
            .map_err(|_| SensorError::BusReadFailed)?;
        Ok(buf[0])
    }
}
