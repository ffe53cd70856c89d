//! Night light: LED on in the evening window, off otherwise.
//!
//! Evaluated at most once per `check_interval_secs`. The window may wrap
//! midnight (20:00 to 07:00 by default). Until the wall clock is synced
//! nothing is evaluated and the throttle is left untouched, so the first
//! tick after sync decides immediately.

use log::info;

use crate::app::events::HomeEvent;
use crate::config::IlluminationConfig;

use super::{Task, TaskContext};

const SECS_PER_DAY: i64 = 86_400;

/// Local hour-of-day for a Unix time at a fixed UTC offset.
pub fn local_hour(unix_secs: i64, utc_offset_secs: i32) -> u8 {
    let secs_of_day = (unix_secs + i64::from(utc_offset_secs)).rem_euclid(SECS_PER_DAY);
    (secs_of_day / 3600) as u8
}

/// `on_hour <= hour < off_hour`, wrapping past midnight when
/// `on_hour > off_hour`. An empty window (`on == off`) is never lit.
pub fn in_window(hour: u8, on_hour: u8, off_hour: u8) -> bool {
    if on_hour <= off_hour {
        hour >= on_hour && hour < off_hour
    } else {
        hour >= on_hour || hour < off_hour
    }
}

pub struct IlluminationTask {
    cfg: IlluminationConfig,
    last_check_ms: Option<u64>,
    lit: Option<bool>,
}

impl IlluminationTask {
    pub fn new(cfg: IlluminationConfig) -> Self {
        Self {
            cfg,
            last_check_ms: None,
            lit: None,
        }
    }

    pub fn is_lit(&self) -> bool {
        self.lit == Some(true)
    }
}

impl Task for IlluminationTask {
    fn name(&self) -> &'static str {
        "illumination"
    }

    fn update(&mut self, ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        let now = ctx.now_ms();
        let interval_ms = u64::from(self.cfg.check_interval_secs) * 1000;
        if self.last_check_ms.is_some_and(|last| now.saturating_sub(last) < interval_ms) {
            return Ok(());
        }
        let Some(unix) = ctx.clock.unix_time_secs() else {
            return Ok(());
        };
        self.last_check_ms = Some(now);

        let hour = local_hour(unix, self.cfg.utc_offset_secs);
        let want = in_window(hour, self.cfg.on_hour, self.cfg.off_hour);
        if let Err(e) = ctx.hw.set_led(want) {
            log::warn!("LED: write failed: {}", e);
        }

        if self.lit != Some(want) {
            self.lit = Some(want);
            info!("LED: {} (local hour {})", if want { "ON" } else { "OFF" }, hour);
            ctx.publish_device_state("led", if want { "on" } else { "off" });
            ctx.emit(HomeEvent::Illumination { on: want, hour });
        }
        Ok(())
    }

    fn cleanup(&mut self, ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        ctx.hw.set_led(false)?;
        self.lit = Some(false);
        Ok(())
    }
}
