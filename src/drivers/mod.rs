//! Actuator drivers, hardware initialisation, and peripheral helpers.

pub mod fan;
pub mod hw_init;
pub mod lcd;
pub mod rgb_strip;
pub mod servo;
pub mod switch;
pub mod watchdog;

pub use fan::Fan;
pub use lcd::Lcd1602;
pub use rgb_strip::{Rgb, RgbStrip};
pub use servo::{Position, Servo};
pub use switch::Switch;
