//! WS2812 RGB strip on the RMT peripheral.
//!
//! Every pixel always shows the same colour; the strip is one logical
//! indicator. Which colour wins is decided by the indicator arbiter, not
//! here.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: encodes GRB bits into an RMT signal and blocks until sent.
//! On host/test: remembers the last colour only.

use serde::Serialize;

#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::rmt::{PinState, Pulse, TxRmtDriver, VariableLengthSignal};

use crate::error::ActuatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Self = Self::new(0, 0, 0);
    pub const RED: Self = Self::new(255, 0, 0);
    pub const GREEN: Self = Self::new(0, 255, 0);
    pub const BLUE: Self = Self::new(0, 0, 255);
    pub const ORANGE: Self = Self::new(255, 165, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn is_off(self) -> bool {
        self == Self::OFF
    }

    /// Wire order for WS2812 is green, red, blue.
    pub fn grb(self) -> u32 {
        (u32::from(self.g) << 16) | (u32::from(self.r) << 8) | u32::from(self.b)
    }
}

pub struct RgbStrip {
    #[cfg(target_os = "espidf")]
    tx: TxRmtDriver<'static>,
    len: usize,
    current: Rgb,
}

impl RgbStrip {
    #[cfg(target_os = "espidf")]
    pub fn new(tx: TxRmtDriver<'static>, len: usize) -> Self {
        Self {
            tx,
            len,
            current: Rgb::OFF,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(len: usize) -> Self {
        Self {
            len,
            current: Rgb::OFF,
        }
    }

    pub fn set(&mut self, colour: Rgb) -> Result<(), ActuatorError> {
        self.current = colour;
        self.transmit(colour)
    }

    pub fn current(&self) -> Rgb {
        self.current
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[cfg(target_os = "espidf")]
    fn transmit(&mut self, colour: Rgb) -> Result<(), ActuatorError> {
        use core::time::Duration;

        let err = |_| ActuatorError::RmtWriteFailed;
        let hz = self.tx.counter_clock().map_err(err)?;
        let t0h = Pulse::new_with_duration(hz, PinState::High, &Duration::from_nanos(350)).map_err(err)?;
        let t0l = Pulse::new_with_duration(hz, PinState::Low, &Duration::from_nanos(800)).map_err(err)?;
        let t1h = Pulse::new_with_duration(hz, PinState::High, &Duration::from_nanos(700)).map_err(err)?;
        let t1l = Pulse::new_with_duration(hz, PinState::Low, &Duration::from_nanos(600)).map_err(err)?;

        let grb = colour.grb();
        let mut signal = VariableLengthSignal::new();
        for _ in 0..self.len {
            for i in (0..24).rev() {
                let pair = if (grb >> i) & 1 == 1 { [&t1h, &t1l] } else { [&t0h, &t0l] };
                signal.push(pair).map_err(err)?;
            }
        }
        self.tx.start_blocking(&signal).map_err(err)
    }

    #[cfg(not(target_os = "espidf"))]
    fn transmit(&mut self, _colour: Rgb) -> Result<(), ActuatorError> {
        Ok(())
    }
}
