//! Smart house controller: main entry point.
//!
//! Hexagonal architecture driven by a fixed-rate scheduler.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter       LogEventSink   SystemClock   WifiAdapter│
//! │  (Sensor+Actuator+     (EventSink)    (ClockPort)   (link)     │
//! │   Display)             EspMqttTransport (Transport)            │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  Scheduler: Tasks · IndicatorArbiter · Channel         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::atomic::AtomicBool;

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::Delay;
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::hal::rmt::{TxRmtDriver, config::TransmitConfig};
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sntp::EspSntp;
use esp_idf_svc::wifi::EspWifi;
use log::{error, info, warn};

use smarthouse::adapters::console;
use smarthouse::adapters::hardware::{Actuators, HardwareAdapter, Sensors};
use smarthouse::adapters::log_sink::LogEventSink;
use smarthouse::adapters::time::SystemClock;
use smarthouse::adapters::wifi::{ConnectivityPort, WifiAdapter};
use smarthouse::app::ports::ClockPort;
use smarthouse::app::topics::Topics;
use smarthouse::config::SystemConfig;
use smarthouse::connectivity::esp_mqtt::EspMqttTransport;
use smarthouse::drivers::watchdog::Watchdog;
use smarthouse::drivers::{RgbStrip, hw_init};
use smarthouse::pins;
use smarthouse::scheduler::Scheduler;
use smarthouse::tasks::{
    AccessControlTask, AirQualityTask, ClimateTask, DeviceControlTask, GasTask, IlluminationTask,
    MoistureTask, OccupancyTask,
};

/// Raised by Ctrl-C on the serial console; ends the loop and safes the house.
static STOP: AtomicBool = AtomicBool::new(false);

fn load_config() -> SystemConfig {
    let Some(json) = option_env!("SMARTHOUSE_CONFIG") else {
        return SystemConfig::default();
    };
    match SystemConfig::from_json(json) {
        Ok(cfg) => {
            info!("Config: build-time override applied");
            cfg
        }
        Err(e) => {
            warn!("Config: override rejected ({}), using defaults", e);
            SystemConfig::default()
        }
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("Smart house controller v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config();

    // ── 2. Peripherals ────────────────────────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        error!("HAL init failed: {}, halting", e);
        return Err(anyhow::anyhow!("peripheral init: {}", e));
    }
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take().ok();

    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio21,
        peripherals.pins.gpio22,
        &I2cConfig::new().baudrate(pins::I2C_FREQ_HZ.Hz()),
    )?;
    let rmt = TxRmtDriver::new(
        peripherals.rmt.channel0,
        peripherals.pins.gpio26,
        &TransmitConfig::new().clock_divider(2),
    )?;

    let hw = HardwareAdapter::new(
        Sensors::from_pins(),
        Actuators::from_pins(RgbStrip::new(rmt, pins::RGB_STRIP_LEN)),
        i2c,
        Delay::new_default(),
    );

    // ── 3. Network: WiFi, wall clock, broker ──────────────────
    let mut wifi = WifiAdapter::new(EspWifi::new(peripherals.modem, sysloop, nvs)?);
    match wifi.set_credentials(
        option_env!("WIFI_SSID").unwrap_or(""),
        option_env!("WIFI_PASS").unwrap_or(""),
    ) {
        Ok(()) => {
            if let Err(e) = wifi.connect() {
                warn!("WiFi: {}, will keep retrying", e);
            }
        }
        Err(e) => warn!("WiFi: {}, running offline", e),
    }
    let _sntp = EspSntp::new_default()?;

    let topics = Topics::new(&config.topic_root);
    let transport = EspMqttTransport::new(config.broker.clone(), &topics.status("online"));

    // ── 4. Scheduler + tasks ──────────────────────────────────
    let clock = SystemClock::new();
    let boot_ms = clock.uptime_ms();
    let mut sched = Scheduler::new(&config, hw, clock, transport, LogEventSink::new());

    sched.register(Box::new(IlluminationTask::new(config.illumination.clone())));
    sched.register(Box::new(ClimateTask::new(&config.climate)));
    sched.register(Box::new(AirQualityTask::new(&config.climate)));
    sched.register(Box::new(OccupancyTask::new()));
    sched.register(Box::new(MoistureTask::new(&config.moisture)));
    sched.register(Box::new(GasTask::new(&config.gas, boot_ms)));
    sched.register(Box::new(AccessControlTask::new(config.access.clone())));
    sched.register(Box::new(DeviceControlTask::new()));

    let watchdog = Watchdog::new(config.tick_interval_ms);
    let uptime = SystemClock::new();

    if let Err(e) = console::spawn(&STOP) {
        warn!("Console: watcher not started ({}), no clean stop available", e);
    }

    info!("System ready. Entering scheduler loop.");

    // ── 5. Run ────────────────────────────────────────────────
    sched.run_with(&STOP, || {
        watchdog.feed();
        wifi.poll(uptime.uptime_ms());
    });
    wifi.disconnect();

    info!("Controller stopped");
    Ok(())
}
