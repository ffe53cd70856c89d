//! Port traits: the hexagonal boundary between task logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Task (domain)
//! ```
//!
//! Driven adapters (sensors, actuators, display, clock, event sink, broker
//! link) implement these traits. Tasks only ever see `&mut dyn` ports
//! through [`TaskContext`](crate::tasks::TaskContext), so every state
//! machine runs unchanged against mocks on the host.
//!
//! ## Error contract
//!
//! - Sensor reads return `Err` for "no observation"; a task never escalates it.
//! - Actuator writes return `Err` for logging only; tasks advance anyway.
//! - Event sinks and publishers cannot fail from the caller's point of view.

use embedded_hal::delay::DelayNs;
use serde::Serialize;

use crate::error::{ActuatorError, SensorError};

pub use crate::drivers::{Position, Rgb};
pub use crate::sensors::{CardId, ClimateReading};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port. Each call is a fresh, bounded-time read.
pub trait SensorPort {
    /// PIR: someone is moving in front of the sensor.
    fn motion(&mut self) -> Result<bool, SensorError>;

    /// Raw water / steam level, 0 (dry) to 4095.
    fn moisture_level(&mut self) -> Result<u16, SensorError>;

    /// `true` means hazard present, whatever the pin polarity.
    fn gas(&mut self) -> Result<bool, SensorError>;

    /// A fully validated temperature / humidity pair.
    fn climate(&mut self) -> Result<ClimateReading, SensorError>;

    /// `Ok(None)` when no card is in the field.
    fn scan_card(&mut self) -> Result<Option<CardId>, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Last commanded state of every output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ActuatorStates {
    pub led: bool,
    pub fan: bool,
    pub buzzer: bool,
    pub door: Position,
    pub window: Position,
    pub rgb: Rgb,
}

/// Write-side port. Commands are idempotent; the adapter records the
/// commanded state even when the write fails.
pub trait ActuatorPort {
    fn set_led(&mut self, on: bool) -> Result<(), ActuatorError>;

    fn set_fan(&mut self, on: bool) -> Result<(), ActuatorError>;

    fn set_buzzer(&mut self, on: bool) -> Result<(), ActuatorError>;

    fn set_door(&mut self, position: Position) -> Result<(), ActuatorError>;

    fn set_window(&mut self, position: Position) -> Result<(), ActuatorError>;

    /// Paint the whole RGB strip. Only the indicator arbiter calls this.
    fn set_rgb(&mut self, colour: Rgb) -> Result<(), ActuatorError>;

    fn actuator_states(&self) -> ActuatorStates;

    /// Best-effort safe state: outputs off, door and window closed,
    /// indicator dark. Every step is attempted; returns how many failed.
    fn safe_all(&mut self) -> usize {
        let results = [
            ("door", self.set_door(Position::Closed)),
            ("window", self.set_window(Position::Closed)),
            ("fan", self.set_fan(false)),
            ("buzzer", self.set_buzzer(false)),
            ("led", self.set_led(false)),
            ("rgb", self.set_rgb(Rgb::OFF)),
        ];
        let mut failed = 0;
        for (name, result) in results {
            if let Err(e) = result {
                log::warn!("Safe: {} failed: {}", name, e);
                failed += 1;
            }
        }
        failed
    }
}

// ───────────────────────────────────────────────────────────────
// Display port
// ───────────────────────────────────────────────────────────────

/// Two-line character display; may not be fitted.
pub trait DisplayPort {
    /// Must be checked before use.
    fn is_available(&self) -> bool;

    /// Replace the screen contents. Each line is cut to the display width.
    fn show_two_lines(&mut self, line1: &str, line2: &str) -> Result<(), ActuatorError>;

    fn clear(&mut self) -> Result<(), ActuatorError>;
}

/// Everything a task can touch on the board.
pub trait Hardware: SensorPort + ActuatorPort + DisplayPort {}

impl<T: SensorPort + ActuatorPort + DisplayPort + ?Sized> Hardware for T {}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic uptime, optional wall clock, and blocking delays.
pub trait ClockPort: DelayNs {
    /// Milliseconds since boot, monotonic.
    fn uptime_ms(&self) -> u64;

    /// Seconds since the Unix epoch, or `None` until the clock is synced.
    fn unix_time_secs(&self) -> Option<i64>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / data sink)
// ───────────────────────────────────────────────────────────────

/// Tasks emit structured [`HomeEvent`](super::events::HomeEvent)s through
/// this port. Adapters decide where they go; failures stay inside the
/// adapter.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::HomeEvent);
}

// ───────────────────────────────────────────────────────────────
// Publisher port (domain → broker)
// ───────────────────────────────────────────────────────────────

/// Fire-and-forget publishing. `false` means dropped (link down or the
/// send failed); callers never retry.
pub trait Publisher {
    fn publish(&mut self, topic: &str, payload: &str) -> bool;

    fn is_connected(&self) -> bool;
}
