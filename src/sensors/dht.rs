//! DHT11 temperature / humidity sensor.
//!
//! Single-wire protocol: the host pulls the line low for ~18 ms, the sensor
//! answers with an 80 µs low / 80 µs high preamble, then 40 bits where the
//! length of each high pulse encodes the bit (~27 µs = 0, ~70 µs = 1).
//!
//! Frame layout: `[rh_int, rh_dec, t_int, t_dec, checksum]`, checksum being
//! the low byte of the sum of the first four. A reading is returned only
//! when the whole frame validates; there are no partial results.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: bit-bangs the data pin with interrupts masked.
//! On host/test: returns the frame injected with [`sim_set_frame`].

use serde::Serialize;

use crate::error::SensorError;

/// One validated climate sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClimateReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

const TEMP_MIN_C: f32 = -20.0;
const TEMP_MAX_C: f32 = 60.0;

/// Decode and validate a raw 5-byte frame.
pub fn decode_frame(frame: [u8; 5]) -> Result<ClimateReading, SensorError> {
    let sum = frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != frame[4] {
        return Err(SensorError::ChecksumMismatch);
    }
    // A line stuck low clocks in all zeros, which passes the checksum.
    if frame == [0; 5] {
        return Err(SensorError::OutOfRange);
    }

    let humidity_pct = f32::from(frame[0]) + f32::from(frame[1]) / 10.0;
    let mut temperature_c = f32::from(frame[2]) + f32::from(frame[3] & 0x7F) / 10.0;
    if frame[3] & 0x80 != 0 {
        temperature_c = -temperature_c;
    }

    if humidity_pct > 100.0 || !(TEMP_MIN_C..=TEMP_MAX_C).contains(&temperature_c) {
        return Err(SensorError::OutOfRange);
    }
    Ok(ClimateReading {
        temperature_c,
        humidity_pct,
    })
}

pub struct Dht11 {
    #[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
    gpio: i32,
}

impl Dht11 {
    pub fn new(gpio: i32) -> Self {
        Self { gpio }
    }

    pub fn read(&mut self) -> Result<ClimateReading, SensorError> {
        decode_frame(self.read_frame()?)
    }

    #[cfg(target_os = "espidf")]
    fn read_frame(&mut self) -> Result<[u8; 5], SensorError> {
        use esp_idf_svc::hal::delay::FreeRtos;
        use esp_idf_svc::sys::*;

        let pin = self.gpio;
        // SAFETY: the DHT pin is owned by this driver; nothing else touches it.
        unsafe {
            gpio_set_direction(pin, gpio_mode_t_GPIO_MODE_INPUT_OUTPUT_OD);
            gpio_set_level(pin, 0);
        }
        FreeRtos::delay_ms(20);

        esp_idf_svc::hal::interrupt::free(|| {
            // SAFETY: as above; timings below are in the tens of µs.
            unsafe {
                gpio_set_level(pin, 1);
                esp_rom_delay_us(30);
            }
            wait_while(pin, true, 100)?;
            wait_while(pin, false, 100)?;
            wait_while(pin, true, 100)?;

            let mut frame = [0u8; 5];
            for bit in 0..40 {
                wait_while(pin, false, 80)?;
                let high_us = wait_while(pin, true, 100)?;
                if high_us > 40 {
                    frame[bit / 8] |= 0x80 >> (bit % 8);
                }
            }
            Ok(frame)
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_frame(&mut self) -> Result<[u8; 5], SensorError> {
        sim::frame().ok_or(SensorError::Timeout)
    }
}

/// Busy-wait while the pin sits at `level`; returns how long it stayed.
#[cfg(target_os = "espidf")]
fn wait_while(pin: i32, level: bool, timeout_us: i64) -> Result<i64, SensorError> {
    use esp_idf_svc::sys::{esp_timer_get_time, gpio_get_level};

    // SAFETY: read-only register access on a configured pin.
    let start = unsafe { esp_timer_get_time() };
    loop {
        let now = unsafe { esp_timer_get_time() };
        if (unsafe { gpio_get_level(pin) } != 0) != level {
            return Ok(now - start);
        }
        if now - start > timeout_us {
            return Err(SensorError::Timeout);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
mod sim {
    use core::sync::atomic::{AtomicU64, Ordering};

    const PRESENT: u64 = 1 << 40;

    /// Bits 0..40 hold the frame, bit 40 marks "sensor answered".
    static SIM_FRAME: AtomicU64 = AtomicU64::new(0);

    pub fn set(frame: Option<[u8; 5]>) {
        let packed = frame.map_or(0, |f| {
            f.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)) | PRESENT
        });
        SIM_FRAME.store(packed, Ordering::Relaxed);
    }

    pub fn frame() -> Option<[u8; 5]> {
        let packed = SIM_FRAME.load(Ordering::Relaxed);
        if packed & PRESENT == 0 {
            return None;
        }
        let mut out = [0u8; 5];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = (packed >> (8 * (4 - i))) as u8;
        }
        Some(out)
    }
}

/// Inject the next frame the simulated sensor returns (`None` = no answer).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_frame(frame: Option<[u8; 5]>) {
    sim::set(frame);
}

/// Build a frame with a correct checksum.
#[cfg(not(target_os = "espidf"))]
pub fn sim_frame(temp_c: u8, humidity_pct: u8) -> [u8; 5] {
    [humidity_pct, 0, temp_c, 0, humidity_pct.wrapping_add(temp_c)]
}
