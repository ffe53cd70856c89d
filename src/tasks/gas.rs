//! Gas hazard: fan on, red indicator.
//!
//! The MQ-2 heater needs time to settle, so nothing is read until
//! `warmup_secs` have passed since the task was built. After that a hazard
//! is confirmed only after `debounce_count` consecutive positive reads; one
//! negative read resets the count. A confirmed hazard clears on the first
//! negative read. A failed read is no observation and leaves the count
//! unchanged.

use log::{debug, info, warn};

use crate::app::events::HomeEvent;
use crate::app::ports::Rgb;
use crate::config::GasConfig;
use crate::indicator::Owner;

use super::{Task, TaskContext};

/// Pure warm-up + consecutive-count logic.
#[derive(Debug, Clone, Copy)]
pub struct GasDebounce {
    started_ms: u64,
    warmup_ms: u64,
    required: u8,
    consecutive: u8,
    confirmed: bool,
    warm: bool,
}

impl GasDebounce {
    pub fn new(cfg: &GasConfig, now_ms: u64) -> Self {
        Self {
            started_ms: now_ms,
            warmup_ms: u64::from(cfg.warmup_secs) * 1000,
            required: cfg.debounce_count.max(1),
            consecutive: 0,
            confirmed: false,
            warm: false,
        }
    }

    /// Warm once strictly more than the warm-up time has elapsed.
    pub fn is_warm(&mut self, now_ms: u64) -> bool {
        if !self.warm && now_ms.saturating_sub(self.started_ms) > self.warmup_ms {
            self.warm = true;
        }
        self.warm
    }

    /// Feed one reading; returns the new confirmed state if it changed.
    pub fn observe(&mut self, detected: bool) -> Option<bool> {
        if detected {
            self.consecutive = self.consecutive.saturating_add(1);
        } else {
            self.consecutive = 0;
        }
        let confirmed = self.consecutive >= self.required;
        if confirmed == self.confirmed {
            return None;
        }
        self.confirmed = confirmed;
        Some(confirmed)
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    pub fn consecutive(&self) -> u8 {
        self.consecutive
    }
}

pub struct GasTask {
    debounce: GasDebounce,
}

impl GasTask {
    /// `now_ms` is the construction time the warm-up counts from.
    pub fn new(cfg: &GasConfig, now_ms: u64) -> Self {
        Self {
            debounce: GasDebounce::new(cfg, now_ms),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.debounce.is_confirmed()
    }
}

impl Task for GasTask {
    fn name(&self) -> &'static str {
        "gas"
    }

    fn update(&mut self, ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        let was_warm = self.debounce.warm;
        if !self.debounce.is_warm(ctx.now_ms()) {
            return Ok(());
        }
        if !was_warm {
            info!("Gas: warm-up complete");
        }

        let detected = match ctx.hw.gas() {
            Ok(d) => d,
            Err(e) => {
                debug!("Gas: no reading ({})", e);
                return Ok(());
            }
        };

        match self.debounce.observe(detected) {
            Some(true) => {
                warn!("Gas: DETECTED");
                if let Err(e) = ctx.hw.set_fan(true) {
                    warn!("Fan: write failed: {}", e);
                }
                ctx.claim(Owner::Gas, Rgb::RED);
                ctx.publish_flag("gas_detected", true);
                ctx.emit(HomeEvent::Gas { confirmed: true });
            }
            Some(false) => {
                info!("Gas: cleared");
                if let Err(e) = ctx.hw.set_fan(false) {
                    warn!("Fan: write failed: {}", e);
                }
                ctx.unclaim(Owner::Gas);
                ctx.publish_flag("gas_detected", false);
                ctx.emit(HomeEvent::Gas { confirmed: false });
            }
            None => {}
        }
        Ok(())
    }

    fn cleanup(&mut self, ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        ctx.unclaim(Owner::Gas);
        if self.debounce.is_confirmed() {
            ctx.hw.set_fan(false)?;
        }
        Ok(())
    }
}
