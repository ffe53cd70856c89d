//! System clock adapter.
//!
//! Implements [`ClockPort`]: monotonic uptime, an optional wall clock, and
//! blocking delays.
//!
//! - **`target_os = "espidf"`**: `esp_timer_get_time()` for uptime,
//!   `gettimeofday()` for wall time (set by SNTP), FreeRTOS for delays.
//! - **`not(target_os = "espidf")`**: `std::time` for host simulation.

use embedded_hal::delay::DelayNs;

use crate::app::ports::ClockPort;

/// Wall-clock seconds before 2020-01-01 mean SNTP has not synced yet.
pub const EPOCH_2020: i64 = 1_577_836_800;

/// `None` for timestamps that can only come from an unsynced RTC.
pub fn synced(unix_secs: i64) -> Option<i64> {
    (unix_secs >= EPOCH_2020).then_some(unix_secs)
}

pub struct SystemClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }
}

#[cfg(target_os = "espidf")]
impl ClockPort for SystemClock {
    fn uptime_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1000
    }

    fn unix_time_secs(&self) -> Option<i64> {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return None;
        }
        synced(tv.tv_sec as i64)
    }
}

#[cfg(not(target_os = "espidf"))]
impl ClockPort for SystemClock {
    fn uptime_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn unix_time_secs(&self) -> Option<i64> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .ok()?;
        synced(now.as_secs() as i64)
    }
}

#[cfg(target_os = "espidf")]
impl DelayNs for SystemClock {
    fn delay_ns(&mut self, ns: u32) {
        esp_idf_svc::hal::delay::Ets::delay_us(ns.div_ceil(1000));
    }

    fn delay_ms(&mut self, ms: u32) {
        esp_idf_svc::hal::delay::FreeRtos::delay_ms(ms);
    }
}

#[cfg(not(target_os = "espidf"))]
impl DelayNs for SystemClock {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }
}
