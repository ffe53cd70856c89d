//! Asthma alert derived from the climate task's readings.
//!
//! Alert when humidity and temperature are both strictly above their
//! thresholds. Evaluated once per new climate reading; before the first
//! reading the task does nothing. While the alert holds, the display shows
//! the alert text and the climate task leaves it alone.

use log::info;

use crate::app::events::HomeEvent;
use crate::app::ports::ClimateReading;
use crate::config::ClimateConfig;

use super::climate::climate_lines;
use super::edge::{Edge, EdgeDetector};
use super::{Task, TaskContext};

pub const ALERT_LINE1: &str = "! ASTHMA ALERT !";
pub const ALERT_LINE2: &str = "H>50% T>27C";

pub struct AirQualityTask {
    humidity_pct: f32,
    temperature_c: f32,
    seen_seq: u32,
    edge: EdgeDetector,
}

impl AirQualityTask {
    pub fn new(cfg: &ClimateConfig) -> Self {
        Self {
            humidity_pct: cfg.alert_humidity_pct,
            temperature_c: cfg.alert_temperature_c,
            seen_seq: 0,
            edge: EdgeDetector::new(),
        }
    }

    pub fn condition(&self, r: &ClimateReading) -> bool {
        r.humidity_pct > self.humidity_pct && r.temperature_c > self.temperature_c
    }

    pub fn is_alerting(&self) -> bool {
        self.edge.is_active()
    }
}

impl Task for AirQualityTask {
    fn name(&self) -> &'static str {
        "air_quality"
    }

    fn update(&mut self, ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        if ctx.shared.climate_seq == self.seen_seq {
            return Ok(());
        }
        self.seen_seq = ctx.shared.climate_seq;
        let Some(reading) = ctx.shared.climate else {
            return Ok(());
        };

        match self.edge.observe(self.condition(&reading)) {
            Some(Edge::Rising) => {
                info!(
                    "AirQuality: ALERT (H={}% T={}C)",
                    reading.humidity_pct, reading.temperature_c
                );
                ctx.shared.air_alert = true;
                ctx.display(ALERT_LINE1, ALERT_LINE2);
                ctx.publish_flag("asthma_alert", true);
                ctx.emit(HomeEvent::AirQualityAlert { active: true });
            }
            Some(Edge::Falling) => {
                info!("AirQuality: cleared");
                ctx.shared.air_alert = false;
                let (l1, l2) = climate_lines(&reading);
                ctx.display(&l1, &l2);
                ctx.publish_flag("asthma_alert", false);
                ctx.emit(HomeEvent::AirQualityAlert { active: false });
            }
            None => {}
        }
        Ok(())
    }
}
