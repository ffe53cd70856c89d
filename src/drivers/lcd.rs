//! LCD1602 (HD44780) behind a PCF8574 I2C backpack, 4-bit mode.
//!
//! Backpack bit map: P0 = RS, P1 = RW, P2 = EN, P3 = backlight,
//! P4..P7 = D4..D7. Writes go out as two nibbles, each latched by an
//! EN pulse.
//!
//! Like the card reader, the driver borrows the bus per call.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::error::ActuatorError;

pub const COLS: usize = 16;
pub const ROWS: u8 = 2;

const RS: u8 = 0x01;
const EN: u8 = 0x04;
const BACKLIGHT: u8 = 0x08;

const CMD_CLEAR: u8 = 0x01;
const CMD_ENTRY_MODE_INC: u8 = 0x06;
const CMD_DISPLAY_ON: u8 = 0x0C;
const CMD_FUNCTION_4BIT_2LINE: u8 = 0x28;
const CMD_SET_DDRAM: u8 = 0x80;

const ROW_OFFSETS: [u8; 2] = [0x00, 0x40];

pub struct Lcd1602 {
    addr: Option<u8>,
}

impl Lcd1602 {
    /// Not yet probed; [`is_present`](Self::is_present) is false until
    /// [`probe`](Self::probe) finds a backpack.
    pub fn new() -> Self {
        Self { addr: None }
    }

    pub fn is_present(&self) -> bool {
        self.addr.is_some()
    }

    /// Try each candidate address and initialise the first that ACKs.
    pub fn probe<I: I2c, D: DelayNs>(&mut self, bus: &mut I, delay: &mut D, candidates: &[u8]) -> bool {
        for &addr in candidates {
            if bus.write(addr, &[BACKLIGHT]).is_ok() && init(bus, delay, addr).is_ok() {
                log::info!("LCD: found backpack at 0x{:02X}", addr);
                self.addr = Some(addr);
                return true;
            }
        }
        log::warn!("LCD: no backpack on {:02X?}", candidates);
        false
    }

    pub fn clear<I: I2c, D: DelayNs>(&mut self, bus: &mut I, delay: &mut D) -> Result<(), ActuatorError> {
        let addr = self.addr.ok_or(ActuatorError::NotPresent)?;
        command(bus, addr, CMD_CLEAR)?;
        delay.delay_ms(2);
        Ok(())
    }

    /// Clear, then write up to [`COLS`] characters on each row. Longer
    /// text is cut, non-ASCII characters become `?`.
    pub fn show_two_lines<I: I2c, D: DelayNs>(
        &mut self,
        bus: &mut I,
        delay: &mut D,
        line1: &str,
        line2: &str,
    ) -> Result<(), ActuatorError> {
        self.clear(bus, delay)?;
        let addr = self.addr.ok_or(ActuatorError::NotPresent)?;
        for (row, text) in [line1, line2].into_iter().enumerate() {
            command(bus, addr, CMD_SET_DDRAM | ROW_OFFSETS[row])?;
            for ch in text.chars().take(COLS) {
                let byte = if ch.is_ascii() { ch as u8 } else { b'?' };
                send(bus, addr, byte, RS)?;
            }
        }
        Ok(())
    }
}

impl Default for Lcd1602 {
    fn default() -> Self {
        Self::new()
    }
}

fn init<I: I2c, D: DelayNs>(bus: &mut I, delay: &mut D, addr: u8) -> Result<(), ActuatorError> {
    delay.delay_ms(50);
    // Reset into 8-bit mode three times, then switch to 4-bit.
    for wait_us in [4500, 4500, 150] {
        write_nibble(bus, addr, 0x30, 0)?;
        delay.delay_us(wait_us);
    }
    write_nibble(bus, addr, 0x20, 0)?;
    for cmd in [CMD_FUNCTION_4BIT_2LINE, CMD_DISPLAY_ON, CMD_CLEAR, CMD_ENTRY_MODE_INC] {
        command(bus, addr, cmd)?;
    }
    delay.delay_ms(2);
    Ok(())
}

fn command<I: I2c>(bus: &mut I, addr: u8, cmd: u8) -> Result<(), ActuatorError> {
    send(bus, addr, cmd, 0)
}

fn send<I: I2c>(bus: &mut I, addr: u8, byte: u8, mode: u8) -> Result<(), ActuatorError> {
    write_nibble(bus, addr, byte & 0xF0, mode)?;
    write_nibble(bus, addr, (byte << 4) & 0xF0, mode)
}

fn write_nibble<I: I2c>(bus: &mut I, addr: u8, nibble: u8, mode: u8) -> Result<(), ActuatorError> {
    let base = nibble | mode | BACKLIGHT;
    bus.write(addr, &[base | EN, base])
        .map_err(|_| ActuatorError::BusWriteFailed)
}
