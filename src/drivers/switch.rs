//! Single-GPIO on/off outputs: porch LED and piezo buzzer.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the pin via hw_init.
//! On host/test: the pin lands in the hw_init simulation.

use crate::drivers::hw_init;
use crate::error::ActuatorError;

pub struct Switch {
    gpio: i32,
    on: bool,
}

impl Switch {
    pub fn new(gpio: i32) -> Self {
        Self { gpio, on: false }
    }

    /// Command the output. The commanded state is recorded even if the
    /// pin write fails, so callers see what was asked for.
    pub fn set(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.on = on;
        hw_init::gpio_write(self.gpio, on)
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}
