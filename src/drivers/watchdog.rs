//! Task Watchdog Timer (TWDT) driver.
//!
//! Resets the board if the scheduler loop stops feeding it. The timeout is
//! derived from the tick period so a single slow tick (a blocking door
//! dwell, a bounded broker connect) never trips it.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Floor for the reset timeout (milliseconds).
pub const MIN_TIMEOUT_MS: u32 = 10_000;

/// Timeout used for a given tick period: twenty ticks, never below
/// [`MIN_TIMEOUT_MS`].
pub fn timeout_for_tick(tick_interval_ms: u32) -> u32 {
    tick_interval_ms.saturating_mul(20).max(MIN_TIMEOUT_MS)
}

pub struct Watchdog {
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl Watchdog {
    /// Reconfigure the TWDT and subscribe the calling task.
    pub fn new(tick_interval_ms: u32) -> Self {
        let timeout_ms = timeout_for_tick(tick_interval_ms);

        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from main before the loop starts.
            unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK {
                    log::warn!("Watchdog: reconfigure returned {}", ret);
                }

                let ret = esp_task_wdt_add(core::ptr::null_mut());
                let subscribed = ret == ESP_OK;
                if subscribed {
                    log::info!("Watchdog: subscribed ({} ms)", timeout_ms);
                } else {
                    log::warn!("Watchdog: failed to subscribe ({})", ret);
                }
                Self { subscribed }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            log::info!("Watchdog(sim): {} ms, no-op", timeout_ms);
            Self {}
        }
    }

    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: the calling task is subscribed.
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }
}
