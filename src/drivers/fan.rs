//! DC fan behind a two-input motor driver.
//!
//! Forward = A high / B low, stop = both low. The fan never runs in
//! reverse.

use crate::drivers::hw_init;
use crate::error::ActuatorError;

pub struct Fan {
    gpio_a: i32,
    gpio_b: i32,
    on: bool,
}

impl Fan {
    pub fn new(gpio_a: i32, gpio_b: i32) -> Self {
        Self {
            gpio_a,
            gpio_b,
            on: false,
        }
    }

    pub fn set(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.on = on;
        // B first so both inputs are never high together.
        let b = hw_init::gpio_write(self.gpio_b, false);
        let a = hw_init::gpio_write(self.gpio_a, on);
        b.and(a)
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}
