//! Mock adapters for integration tests.
//!
//! `MockHardware` records every actuator call and serves scripted sensor
//! values, `FakeClock` only moves when told to (or when something
//! delays on it), and `RecordingSink` keeps every emitted event.

use embedded_hal::delay::DelayNs;
use smarthouse::app::events::HomeEvent;
use smarthouse::app::ports::{
    ActuatorPort, ActuatorStates, CardId, ClimateReading, ClockPort, DisplayPort, EventSink,
    Position, Rgb, SensorPort,
};
use smarthouse::config::SystemConfig;
use smarthouse::connectivity::MemoryTransport;
use smarthouse::error::{ActuatorError, SensorError};
use smarthouse::scheduler::Scheduler;

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    Led(bool),
    Fan(bool),
    Buzzer(bool),
    Door(Position),
    Window(Position),
    Rgb(Rgb),
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub motion: Result<bool, SensorError>,
    pub moisture: Result<u16, SensorError>,
    pub gas: Result<bool, SensorError>,
    pub climate: Result<ClimateReading, SensorError>,
    /// Card currently held on the reader.
    pub card: Option<CardId>,
    pub display_fitted: bool,
    /// Every write fails (but is still recorded).
    pub fail_writes: bool,
    /// `motion()` panics.
    pub panic_on_motion: bool,

    pub calls: Vec<ActuatorCall>,
    pub screen: Option<(String, String)>,
    pub climate_reads: u32,
    states: ActuatorStates,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            motion: Ok(false),
            moisture: Ok(0),
            gas: Ok(false),
            climate: Err(SensorError::Timeout),
            card: None,
            display_fitted: true,
            fail_writes: false,
            panic_on_motion: false,
            calls: Vec::new(),
            screen: None,
            climate_reads: 0,
            states: ActuatorStates::default(),
        }
    }

    pub fn rgb_writes(&self) -> Vec<Rgb> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                ActuatorCall::Rgb(rgb) => Some(*rgb),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: ActuatorCall) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn line1(&self) -> Option<&str> {
        self.screen.as_ref().map(|(l1, _)| l1.as_str())
    }

    pub fn line2(&self) -> Option<&str> {
        self.screen.as_ref().map(|(_, l2)| l2.as_str())
    }

    fn record(&mut self, call: ActuatorCall) -> Result<(), ActuatorError> {
        self.calls.push(call);
        match call {
            ActuatorCall::Led(on) => self.states.led = on,
            ActuatorCall::Fan(on) => self.states.fan = on,
            ActuatorCall::Buzzer(on) => self.states.buzzer = on,
            ActuatorCall::Door(p) => self.states.door = p,
            ActuatorCall::Window(p) => self.states.window = p,
            ActuatorCall::Rgb(rgb) => self.states.rgb = rgb,
        }
        if self.fail_writes {
            Err(ActuatorError::GpioWriteFailed)
        } else {
            Ok(())
        }
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for MockHardware {
    fn motion(&mut self) -> Result<bool, SensorError> {
        if self.panic_on_motion {
            panic!("PIR driver exploded");
        }
        self.motion
    }

    fn moisture_level(&mut self) -> Result<u16, SensorError> {
        self.moisture
    }

    fn gas(&mut self) -> Result<bool, SensorError> {
        self.gas
    }

    fn climate(&mut self) -> Result<ClimateReading, SensorError> {
        self.climate_reads += 1;
        self.climate
    }

    fn scan_card(&mut self) -> Result<Option<CardId>, SensorError> {
        Ok(self.card.clone())
    }
}

impl ActuatorPort for MockHardware {
    fn set_led(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.record(ActuatorCall::Led(on))
    }

    fn set_fan(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.record(ActuatorCall::Fan(on))
    }

    fn set_buzzer(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.record(ActuatorCall::Buzzer(on))
    }

    fn set_door(&mut self, position: Position) -> Result<(), ActuatorError> {
        self.record(ActuatorCall::Door(position))
    }

    fn set_window(&mut self, position: Position) -> Result<(), ActuatorError> {
        self.record(ActuatorCall::Window(position))
    }

    fn set_rgb(&mut self, colour: Rgb) -> Result<(), ActuatorError> {
        self.record(ActuatorCall::Rgb(colour))
    }

    fn actuator_states(&self) -> ActuatorStates {
        self.states
    }
}

impl DisplayPort for MockHardware {
    fn is_available(&self) -> bool {
        self.display_fitted
    }

    fn show_two_lines(&mut self, line1: &str, line2: &str) -> Result<(), ActuatorError> {
        if !self.display_fitted {
            return Err(ActuatorError::NotPresent);
        }
        self.screen = Some((line1.chars().take(16).collect(), line2.chars().take(16).collect()));
        Ok(())
    }

    fn clear(&mut self) -> Result<(), ActuatorError> {
        self.screen = None;
        Ok(())
    }
}

// ── FakeClock ─────────────────────────────────────────────────

/// Manual clock. Delays advance time instead of sleeping.
pub struct FakeClock {
    now_ns: u64,
    /// Unix time at uptime zero; `None` = wall clock not synced.
    pub unix_at_boot: Option<i64>,
    pub delays_ms: Vec<u32>,
}

#[allow(dead_code)]
impl FakeClock {
    pub fn new() -> Self {
        Self {
            now_ns: 0,
            unix_at_boot: None,
            delays_ms: Vec::new(),
        }
    }

    pub fn advance_ms(&mut self, ms: u64) {
        self.now_ns += ms * 1_000_000;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl DelayNs for FakeClock {
    fn delay_ns(&mut self, ns: u32) {
        self.now_ns += u64::from(ns);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delays_ms.push(ms);
        self.advance_ms(u64::from(ms));
    }
}

impl ClockPort for FakeClock {
    fn uptime_ms(&self) -> u64 {
        self.now_ns / 1_000_000
    }

    fn unix_time_secs(&self) -> Option<i64> {
        self.unix_at_boot.map(|t| t + (self.uptime_ms() / 1000) as i64)
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<HomeEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&HomeEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &HomeEvent) {
        self.events.push(event.clone());
    }
}

// ── Harness ───────────────────────────────────────────────────

pub type House = Scheduler<MockHardware, FakeClock, MemoryTransport, RecordingSink>;

pub const ROOT: &str = "ks5009/house";

pub fn house(cfg: &SystemConfig) -> House {
    Scheduler::new(
        cfg,
        MockHardware::new(),
        FakeClock::new(),
        MemoryTransport::new(),
        RecordingSink::default(),
    )
}

/// `<root>/<suffix>`.
#[allow(dead_code)]
pub fn topic(suffix: &str) -> String {
    format!("{ROOT}/{suffix}")
}

#[allow(dead_code)]
pub fn card(id: &str) -> CardId {
    let mut c = CardId::new();
    c.push_str(id).expect("card id fits");
    c
}

/// Advance by one tick interval, then tick.
#[allow(dead_code)]
pub fn step(h: &mut House, ms: u64) {
    h.clock_mut().advance_ms(ms);
    h.tick();
}
