//! Sensor drivers.
//!
//! Each driver reads one physical quantity and returns `Result<_, SensorError>`;
//! an `Err` is "no observation this tick", never a panic. Polarity and
//! threshold details stay inside the driver so tasks only ever see
//! "condition present" booleans or fully validated values.

pub mod dht;
pub mod digital;
pub mod rfid;
pub mod water;

pub use dht::{ClimateReading, Dht11};
pub use digital::DigitalSensor;
pub use rfid::{CardId, Mfrc522};
pub use water::WaterSensor;
