//! Steam / water on the sensor: close the window, show blue.
//!
//! The raw ADC level counts as wet when strictly above the configured
//! threshold. The window is only closed on the dry→wet edge, so a manual
//! "open" while still wet is respected.

use log::{debug, info, warn};

use crate::app::events::HomeEvent;
use crate::app::ports::{Position, Rgb};
use crate::config::MoistureConfig;
use crate::indicator::Owner;

use super::edge::{Edge, EdgeDetector};
use super::{Task, TaskContext};

pub struct MoistureTask {
    wet_threshold: u16,
    edge: EdgeDetector,
}

impl MoistureTask {
    pub fn new(cfg: &MoistureConfig) -> Self {
        Self {
            wet_threshold: cfg.wet_threshold,
            edge: EdgeDetector::new(),
        }
    }
}

impl Task for MoistureTask {
    fn name(&self) -> &'static str {
        "moisture"
    }

    fn update(&mut self, ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        let level = match ctx.hw.moisture_level() {
            Ok(l) => l,
            Err(e) => {
                debug!("Moisture: no reading ({})", e);
                return Ok(());
            }
        };
        let wet = level > self.wet_threshold;

        match self.edge.observe(wet) {
            Some(Edge::Rising) => {
                info!("Moisture: wet (level {}), closing window", level);
                if let Err(e) = ctx.hw.set_window(Position::Closed) {
                    warn!("Window: write failed: {}", e);
                }
                ctx.publish_device_state("window", Position::Closed.as_str());
                ctx.publish_flag("steam_detected", true);
                ctx.claim(Owner::Moisture, Rgb::BLUE);
                ctx.emit(HomeEvent::Moisture { wet: true, level });
            }
            Some(Edge::Falling) => {
                info!("Moisture: dry (level {})", level);
                ctx.publish_flag("steam_detected", false);
                ctx.unclaim(Owner::Moisture);
                ctx.emit(HomeEvent::Moisture { wet: false, level });
            }
            None => {}
        }
        Ok(())
    }

    fn cleanup(&mut self, ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        ctx.unclaim(Owner::Moisture);
        Ok(())
    }
}
