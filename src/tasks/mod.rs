//! Per-domain tasks.
//!
//! Each task is a small state machine over its own sensors and actuators.
//! The scheduler calls [`Task::update`] once per tick and routes matching
//! inbound messages to [`Task::on_message`] during the pump step. Tasks
//! never see each other; the only cross-task data is [`SharedState`].
//!
//! | Task            | States            | Trigger                  |
//! |-----------------|-------------------|--------------------------|
//! | Illumination    | on / off          | local time of day        |
//! | Climate         | idle / reading    | elapsed interval         |
//! | AirQuality      | clear / alert     | new climate reading      |
//! | Occupancy       | clear / active    | PIR edge                 |
//! | Moisture        | dry / wet         | water level edge         |
//! | Gas             | clear / confirmed | debounced MQ-2 edge      |
//! | AccessControl   | idle / pending    | card scan                |
//! | DeviceControl   | (stateless)       | inbound command          |

pub mod access;
pub mod air_quality;
pub mod climate;
pub mod device_control;
pub mod edge;
pub mod gas;
pub mod illumination;
pub mod moisture;
pub mod occupancy;

use log::debug;

use crate::app::events::HomeEvent;
use crate::app::ports::{ClimateReading, ClockPort, EventSink, Hardware, Publisher, Rgb};
use crate::app::topics::{TopicBuf, Topics};
use crate::connectivity::InboundMessage;
use crate::error::ActuatorError;
use crate::indicator::{IndicatorArbiter, Owner};

pub use access::AccessControlTask;
pub use air_quality::AirQualityTask;
pub use climate::ClimateTask;
pub use device_control::DeviceControlTask;
pub use gas::GasTask;
pub use illumination::IlluminationTask;
pub use moisture::MoistureTask;
pub use occupancy::OccupancyTask;

/// Filters a task may ask to receive.
pub type Subscriptions = heapless::Vec<TopicBuf, 2>;

/// Data written by one task and read by another.
#[derive(Debug, Default, Clone, Copy)]
pub struct SharedState {
    /// Most recent successful climate reading.
    pub climate: Option<ClimateReading>,
    /// Bumped on every new climate reading.
    pub climate_seq: u32,
    /// The air-quality alert currently owns the display.
    pub air_alert: bool,
}

/// Everything a task may touch during one call.
pub struct TaskContext<'a> {
    pub hw: &'a mut dyn Hardware,
    pub indicator: &'a mut IndicatorArbiter,
    pub link: &'a mut dyn Publisher,
    pub clock: &'a mut dyn ClockPort,
    pub sink: &'a mut dyn EventSink,
    pub topics: &'a Topics,
    pub shared: &'a mut SharedState,
}

impl TaskContext<'_> {
    pub fn now_ms(&self) -> u64 {
        self.clock.uptime_ms()
    }

    /// Best-effort publish; a drop is logged, never an error.
    pub fn publish(&mut self, topic: &str, payload: &str) -> bool {
        let sent = self.link.publish(topic, payload);
        if !sent {
            debug!("publish dropped: {} = {}", topic, payload);
        }
        sent
    }

    /// `"1"` / `"0"` on `<root>/events/<name>`.
    pub fn publish_flag(&mut self, event: &str, active: bool) -> bool {
        let topic = self.topics.event(event);
        self.publish(&topic, if active { "1" } else { "0" })
    }

    pub fn publish_device_state(&mut self, device: &str, state: &str) -> bool {
        let topic = self.topics.device_state(device);
        self.publish(&topic, state)
    }

    pub fn claim(&mut self, owner: Owner, colour: Rgb) -> bool {
        self.indicator.request(owner, colour, &mut *self.hw)
    }

    pub fn unclaim(&mut self, owner: Owner) -> bool {
        self.indicator.release(owner, &mut *self.hw)
    }

    pub fn emit(&mut self, event: HomeEvent) {
        self.sink.emit(&event);
    }

    /// Write both lines if a display is fitted.
    pub fn display(&mut self, line1: &str, line2: &str) {
        if !self.hw.is_available() {
            return;
        }
        if let Err(e) = self.hw.show_two_lines(line1, line2) {
            log::warn!("Display: write failed: {}", e);
        }
    }
}

/// A per-domain state machine driven by the scheduler.
pub trait Task {
    fn name(&self) -> &'static str;

    /// Topic filters whose messages should reach [`on_message`](Task::on_message).
    fn subscriptions(&self, _topics: &Topics) -> Subscriptions {
        Subscriptions::new()
    }

    /// One tick of work. Must return promptly apart from explicit,
    /// bounded clock delays.
    fn update(&mut self, ctx: &mut TaskContext<'_>) -> anyhow::Result<()>;

    /// Called synchronously from the pump step for matching messages.
    fn on_message(&mut self, _msg: &InboundMessage, _ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Put owned actuators into their safe state before shutdown.
    fn cleanup(&mut self, _ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Shorthand for building a [`Subscriptions`] list.
pub(crate) fn subscriptions<I: IntoIterator<Item = TopicBuf>>(filters: I) -> Subscriptions {
    let mut out = Subscriptions::new();
    for f in filters {
        if out.push(f).is_err() {
            log::warn!("Task: too many subscriptions");
            break;
        }
    }
    out
}

/// Run every cleanup write, log each failure, then fail if any did.
pub(crate) fn attempt_each<const N: usize>(
    task: &str,
    steps: [(&str, Result<(), ActuatorError>); N],
) -> anyhow::Result<()> {
    let mut failed = 0;
    for (name, result) in steps {
        if let Err(e) = result {
            log::warn!("{}: cleanup {} failed: {}", task, name, e);
            failed += 1;
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {N} cleanup writes failed");
    }
    Ok(())
}
