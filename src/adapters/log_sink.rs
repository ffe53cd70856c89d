//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing each [`HomeEvent`] as one
//! `TAG | key=value` line to the logger (UART / USB-CDC in production).
//! An external data sink would implement the same trait.

use log::{info, warn};

use crate::app::events::HomeEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`HomeEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink {
    emitted: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events written since construction.
    pub fn emitted(&self) -> u32 {
        self.emitted
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &HomeEvent) {
        self.emitted = self.emitted.wrapping_add(1);
        match event {
            HomeEvent::Started { tasks } => info!("START | tasks={}", tasks),
            HomeEvent::Illumination { on, hour } => {
                info!("LIGHT | led={} | hour={}", on_off(*on), hour)
            }
            HomeEvent::Climate(r) => info!(
                "CLIMATE | T={:.1}\u{00b0}C | H={:.1}%",
                r.temperature_c, r.humidity_pct
            ),
            HomeEvent::AirQualityAlert { active } => info!("ASTHMA | active={}", active),
            HomeEvent::Occupancy { present } => info!("MOTION | present={}", present),
            HomeEvent::Moisture { wet, level } => info!("STEAM | wet={} | level={}", wet, level),
            HomeEvent::Gas { confirmed } => {
                if *confirmed {
                    warn!("GAS | confirmed=true");
                } else {
                    info!("GAS | confirmed=false");
                }
            }
            HomeEvent::CardScanned { card } => info!("RFID | card={}", card),
            HomeEvent::AccessDecision { card, decision } => {
                info!("ACCESS | card={} | decision={:?}", card, decision)
            }
            HomeEvent::DeviceCommanded(cmd) => {
                info!("DEVICE | {}={}", cmd.device(), cmd.state())
            }
            HomeEvent::LinkUp => info!("LINK | up"),
            HomeEvent::LinkDown => warn!("LINK | down"),
            HomeEvent::TaskFault { task } => warn!("FAULT | task={}", task),
            HomeEvent::Heartbeat(h) => info!(
                "BEAT | up={}s | ticks={} | faults={} | overruns={} | link={} | pub={} drop={}",
                h.uptime_secs,
                h.ticks,
                h.task_faults,
                h.overruns,
                if h.connected { "up" } else { "down" },
                h.published,
                h.dropped,
            ),
            HomeEvent::ShuttingDown => info!("STOP | safing actuators"),
        }
    }
}
