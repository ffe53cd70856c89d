//! Periodic temperature / humidity logging.
//!
//! Reads once per `interval_secs` and publishes temperature and humidity
//! on separate sensor topics. A failed read does not advance the
//! interval timer: the next tick tries again until a read succeeds.
//!
//! Successful readings are stored in [`SharedState`](super::SharedState)
//! for the air-quality task. The display shows the latest values unless
//! the air-quality alert currently owns it.

use log::{info, warn};

use crate::app::events::HomeEvent;
use crate::app::ports::ClimateReading;
use crate::config::ClimateConfig;

use super::{Task, TaskContext};

/// Normal two-line climate text.
pub fn climate_lines(r: &ClimateReading) -> (heapless::String<16>, heapless::String<16>) {
    use core::fmt::Write;

    let mut l1 = heapless::String::new();
    let mut l2 = heapless::String::new();
    // Overflow only truncates the display text.
    let _ = write!(l1, "Temp: {}C", r.temperature_c);
    let _ = write!(l2, "Humidity: {}%", r.humidity_pct);
    (l1, l2)
}

/// Decimal text without a trailing `.0` for whole values.
fn decimal(v: f32) -> heapless::String<16> {
    use core::fmt::Write;

    let mut out = heapless::String::new();
    let _ = write!(out, "{}", v);
    out
}

pub struct ClimateTask {
    interval_ms: u64,
    last_read_ms: Option<u64>,
    failures: u32,
}

impl ClimateTask {
    pub fn new(cfg: &ClimateConfig) -> Self {
        Self {
            interval_ms: u64::from(cfg.interval_secs) * 1000,
            last_read_ms: None,
            failures: 0,
        }
    }

    /// Consecutive failed reads since the last success.
    pub fn failures(&self) -> u32 {
        self.failures
    }
}

impl Task for ClimateTask {
    fn name(&self) -> &'static str {
        "climate"
    }

    fn update(&mut self, ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        let now = ctx.now_ms();
        if self.last_read_ms.is_some_and(|last| now.saturating_sub(last) < self.interval_ms) {
            return Ok(());
        }

        let reading = match ctx.hw.climate() {
            Ok(r) => r,
            Err(e) => {
                self.failures = self.failures.saturating_add(1);
                if self.failures == 1 {
                    warn!("Climate: read failed ({}), retrying every tick", e);
                }
                return Ok(());
            }
        };
        self.failures = 0;
        self.last_read_ms = Some(now);

        info!("Climate: {}C, {}%", reading.temperature_c, reading.humidity_pct);
        ctx.shared.climate = Some(reading);
        ctx.shared.climate_seq = ctx.shared.climate_seq.wrapping_add(1);

        let temperature = ctx.topics.sensor("temperature");
        ctx.publish(&temperature, &decimal(reading.temperature_c));
        let humidity = ctx.topics.sensor("humidity");
        ctx.publish(&humidity, &decimal(reading.humidity_pct));

        if !ctx.shared.air_alert {
            let (l1, l2) = climate_lines(&reading);
            ctx.display(&l1, &l2);
        }
        ctx.emit(HomeEvent::Climate(reading));
        Ok(())
    }
}
