//! Motion: orange indicator while someone is present.

use log::{debug, info};

use crate::app::events::HomeEvent;
use crate::app::ports::Rgb;
use crate::indicator::Owner;

use super::edge::{Edge, EdgeDetector};
use super::{Task, TaskContext};

#[derive(Default)]
pub struct OccupancyTask {
    edge: EdgeDetector,
}

impl OccupancyTask {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Task for OccupancyTask {
    fn name(&self) -> &'static str {
        "occupancy"
    }

    fn update(&mut self, ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        let present = match ctx.hw.motion() {
            Ok(p) => p,
            Err(e) => {
                debug!("Occupancy: no reading ({})", e);
                return Ok(());
            }
        };

        match self.edge.observe(present) {
            Some(Edge::Rising) => {
                info!("Occupancy: motion detected");
                ctx.publish_flag("motion_detected", true);
                ctx.claim(Owner::Occupancy, Rgb::ORANGE);
                ctx.emit(HomeEvent::Occupancy { present: true });
            }
            Some(Edge::Falling) => {
                info!("Occupancy: clear");
                ctx.publish_flag("motion_detected", false);
                ctx.unclaim(Owner::Occupancy);
                ctx.emit(HomeEvent::Occupancy { present: false });
            }
            None => {}
        }
        Ok(())
    }

    fn cleanup(&mut self, ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        ctx.unclaim(Owner::Occupancy);
        Ok(())
    }
}
