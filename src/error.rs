//! Error types for the smart house firmware.
//!
//! One enum per subsystem. Tasks surface them through `anyhow`, ports
//! return them directly. All variants are `Copy` so they travel through
//! tasks and ports without allocation.
//!
//! | Category   | Recovery                                              |
//! |------------|-------------------------------------------------------|
//! | Sensor     | treated as "no observation this tick"                 |
//! | Actuator   | logged, state machine advances optimistically         |
//! | Comms      | connected flag drops, scheduler retries every tick    |
//! | Config     | rejected at load time, defaults used                  |

use core::fmt;

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

/// Why a sensor read produced no observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// GPIO read returned an error.
    GpioReadFailed,
    /// ADC read returned an error or timed out.
    AdcReadFailed,
    /// The device did not answer within its protocol window.
    Timeout,
    /// I2C transaction with the sensor failed.
    BusReadFailed,
    /// A framed reading failed its checksum.
    ChecksumMismatch,
    /// Reading is outside the physically plausible range.
    OutOfRange,
    /// No device is fitted / wired on this build.
    NotPresent,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioReadFailed => write!(f, "GPIO read failed"),
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::Timeout => write!(f, "sensor timed out"),
            Self::BusReadFailed => write!(f, "I2C read failed"),
            Self::ChecksumMismatch => write!(f, "checksum mismatch"),
            Self::OutOfRange => write!(f, "reading out of range"),
            Self::NotPresent => write!(f, "sensor not present"),
        }
    }
}

impl std::error::Error for SensorError {}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// GPIO set failed.
    GpioWriteFailed,
    /// PWM duty-cycle write failed.
    PwmWriteFailed,
    /// RMT pixel transmission failed.
    RmtWriteFailed,
    /// I2C transaction with a peripheral failed.
    BusWriteFailed,
    /// No device is fitted / wired on this build.
    NotPresent,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
            Self::PwmWriteFailed => write!(f, "PWM write failed"),
            Self::RmtWriteFailed => write!(f, "RMT write failed"),
            Self::BusWriteFailed => write!(f, "I2C write failed"),
            Self::NotPresent => write!(f, "actuator not present"),
        }
    }
}

impl std::error::Error for ActuatorError {}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// Operation attempted while the link is down.
    NotConnected,
    /// Broker refused or could not be reached.
    ConnectFailed,
    /// Broker did not acknowledge the session within the bounded wait.
    ConnectTimeout,
    PublishFailed,
    SubscribeFailed,
    /// The transport reported a broken session while polling.
    TransportClosed,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::ConnectFailed => write!(f, "broker connect failed"),
            Self::ConnectTimeout => write!(f, "broker connect timed out"),
            Self::PublishFailed => write!(f, "publish failed"),
            Self::SubscribeFailed => write!(f, "subscribe failed"),
            Self::TransportClosed => write!(f, "transport closed"),
        }
    }
}

impl std::error::Error for CommsError {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The stored / baked-in document could not be parsed.
    Malformed,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "config document malformed"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
