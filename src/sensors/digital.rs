//! Single-pin digital detectors (PIR motion, MQ-2 gas module).
//!
//! The MQ-2 comparator output is active LOW while the PIR drives HIGH on
//! motion. [`DigitalSensor::detected`] always answers "is the condition
//! present", whatever the pin polarity.

use crate::drivers::hw_init;
use crate::error::SensorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

pub struct DigitalSensor {
    gpio: i32,
    polarity: Polarity,
}

impl DigitalSensor {
    pub fn new(gpio: i32, polarity: Polarity) -> Self {
        Self { gpio, polarity }
    }

    pub fn detected(&self) -> Result<bool, SensorError> {
        let level = hw_init::gpio_read(self.gpio)?;
        Ok(match self.polarity {
            Polarity::ActiveHigh => level,
            Polarity::ActiveLow => !level,
        })
    }
}
