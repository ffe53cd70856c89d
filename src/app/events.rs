//! Outbound home events.
//!
//! Tasks and the scheduler emit these through the
//! [`EventSink`](super::ports::EventSink) port. This is the data-sink
//! boundary: adapters log them, forward them, or drop them.

use serde::Serialize;

use super::commands::DeviceCommand;
use super::ports::{CardId, ClimateReading};

/// Outcome of an access-control decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    Granted,
    Denied,
    /// No remote verdict arrived in time; treated as denied.
    TimedOut,
}

impl AccessDecision {
    pub fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Structured events emitted by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum HomeEvent {
    /// The scheduler started with this many tasks registered.
    Started { tasks: usize },

    /// Night light switched; `hour` is local hour-of-day.
    Illumination { on: bool, hour: u8 },

    /// A fresh climate reading was taken.
    Climate(ClimateReading),

    AirQualityAlert { active: bool },

    Occupancy { present: bool },

    Moisture { wet: bool, level: u16 },

    /// Gas hazard confirmed (after debounce) or cleared.
    Gas { confirmed: bool },

    CardScanned { card: CardId },

    AccessDecision { card: CardId, decision: AccessDecision },

    /// An inbound command drove an actuator.
    DeviceCommanded(DeviceCommand),

    /// Broker session established / lost.
    LinkUp,
    LinkDown,

    /// A task returned an error or panicked during a tick.
    TaskFault { task: &'static str },

    Heartbeat(HeartbeatData),

    /// Operator-requested stop; actuators are being safed.
    ShuttingDown,
}

/// Periodic liveness snapshot, also published as flat JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeartbeatData {
    pub uptime_secs: u64,
    pub ticks: u64,
    pub task_faults: u32,
    pub overruns: u32,
    pub connected: bool,
    pub published: u32,
    pub dropped: u32,
}
