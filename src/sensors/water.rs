//! Analog water / steam sensor.
//!
//! Reads the raw 12-bit level from ADC1 (initialised by hw_init). The wet
//! threshold is applied by the moisture task so it stays configurable.

use crate::drivers::hw_init;
use crate::error::SensorError;

/// Full-scale value of the 12-bit ADC.
pub const ADC_MAX: u16 = 4095;

pub struct WaterSensor {
    channel: u32,
}

impl WaterSensor {
    pub fn new(channel: u32) -> Self {
        Self { channel }
    }

    /// Raw level, 0 (dry) to [`ADC_MAX`].
    pub fn level(&self) -> Result<u16, SensorError> {
        let raw = hw_init::adc1_read(self.channel)?;
        if raw > ADC_MAX {
            return Err(SensorError::OutOfRange);
        }
        Ok(raw)
    }
}
