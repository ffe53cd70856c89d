//! Per-task behaviour driven through the scheduler against mock hardware.

use smarthouse::app::commands::DeviceCommand;
use smarthouse::app::events::HomeEvent;
use smarthouse::app::ports::{ActuatorPort, ClimateReading, Position, Rgb};
use smarthouse::config::SystemConfig;
use smarthouse::error::SensorError;
use smarthouse::indicator::Owner;
use smarthouse::tasks::air_quality::{ALERT_LINE1, ALERT_LINE2};
use smarthouse::tasks::{
    AirQualityTask, ClimateTask, DeviceControlTask, GasTask, IlluminationTask, MoistureTask,
    OccupancyTask,
};

use crate::mock_hw::{ActuatorCall, House, house, step, topic};

const TICK: u64 = 500;

fn published(h: &House, suffix: &str) -> Vec<String> {
    h.channel()
        .transport()
        .payloads_on(&topic(suffix))
        .into_iter()
        .map(str::to_owned)
        .collect()
}

// ── Edge-triggered publishing ─────────────────────────────────

#[test]
fn occupancy_publishes_only_on_edges() {
    let mut h = house(&SystemConfig::default());
    h.register(Box::new(OccupancyTask::new()));
    h.start();

    let mut seen = Vec::new();
    for present in [false, false, true, true, false] {
        h.hw_mut().motion = Ok(present);
        step(&mut h, TICK);
        seen.push(published(&h, "events/motion_detected").len());
    }
    assert_eq!(seen, [0, 0, 1, 1, 2]);
    assert_eq!(published(&h, "events/motion_detected"), ["1", "0"]);
}

#[test]
fn moisture_closes_window_once_on_wet_edge() {
    let mut h = house(&SystemConfig::default());
    h.register(Box::new(MoistureTask::new(&SystemConfig::default().moisture)));
    h.start();

    let mut seen = Vec::new();
    for level in [100, 2000, 2500, 3100, 40] {
        h.hw_mut().moisture = Ok(level);
        step(&mut h, TICK);
        seen.push(published(&h, "events/steam_detected").len());
    }
    // 2000 is not above the threshold.
    assert_eq!(seen, [0, 0, 1, 1, 2]);
    assert_eq!(published(&h, "events/steam_detected"), ["1", "0"]);
    assert_eq!(h.hw().count(ActuatorCall::Window(Position::Closed)), 1);
    assert_eq!(published(&h, "devices/window/state"), ["closed"]);
}

#[test]
fn sensor_failure_is_no_observation() {
    let mut h = house(&SystemConfig::default());
    h.register(Box::new(OccupancyTask::new()));
    h.start();

    h.hw_mut().motion = Ok(true);
    step(&mut h, TICK);
    h.hw_mut().motion = Err(SensorError::GpioReadFailed);
    step(&mut h, TICK);
    h.hw_mut().motion = Ok(true);
    step(&mut h, TICK);

    assert_eq!(published(&h, "events/motion_detected"), ["1"]);
    assert_eq!(h.task_faults(), 0);
}

// ── Gas ───────────────────────────────────────────────────────

#[test]
fn gas_ignores_readings_during_warmup() {
    let cfg = SystemConfig::default();
    let mut h = house(&cfg);
    h.register(Box::new(GasTask::new(&cfg.gas, 0)));
    h.start();

    h.hw_mut().gas = Ok(true);
    for _ in 0..20 {
        step(&mut h, TICK);
    }
    assert!(published(&h, "events/gas_detected").is_empty());
    assert_eq!(h.hw().count(ActuatorCall::Fan(true)), 0);
}

#[test]
fn gas_debounce_resets_on_a_single_negative() {
    let cfg = SystemConfig::default();
    let mut h = house(&cfg);
    h.register(Box::new(GasTask::new(&cfg.gas, 0)));
    h.start();
    h.clock_mut().advance_ms(30_000);

    h.hw_mut().gas = Ok(true);
    for _ in 0..5 {
        step(&mut h, TICK);
    }
    h.hw_mut().gas = Ok(false);
    step(&mut h, TICK);
    assert!(published(&h, "events/gas_detected").is_empty());

    h.hw_mut().gas = Ok(true);
    for _ in 0..5 {
        step(&mut h, TICK);
    }
    assert!(published(&h, "events/gas_detected").is_empty());
    step(&mut h, TICK);
    assert_eq!(published(&h, "events/gas_detected"), ["1"]);
    assert!(h.hw().actuator_states().fan);
    assert_eq!(h.indicator().current_owner(), Some(Owner::Gas));
    assert_eq!(h.hw().actuator_states().rgb, Rgb::RED);

    h.hw_mut().gas = Ok(false);
    step(&mut h, TICK);
    assert_eq!(published(&h, "events/gas_detected"), ["1", "0"]);
    assert!(!h.hw().actuator_states().fan);
    assert_eq!(h.indicator().current_owner(), None);
}

#[test]
fn gas_failed_read_keeps_the_count() {
    let cfg = SystemConfig::default();
    let mut h = house(&cfg);
    h.register(Box::new(GasTask::new(&cfg.gas, 0)));
    h.start();
    h.clock_mut().advance_ms(30_000);

    h.hw_mut().gas = Ok(true);
    for _ in 0..3 {
        step(&mut h, TICK);
    }
    h.hw_mut().gas = Err(SensorError::GpioReadFailed);
    step(&mut h, TICK);
    h.hw_mut().gas = Ok(true);
    for _ in 0..3 {
        step(&mut h, TICK);
    }
    assert_eq!(published(&h, "events/gas_detected"), ["1"]);
}

// ── Climate + air quality ─────────────────────────────────────

#[test]
fn climate_is_throttled_to_the_interval() {
    let cfg = SystemConfig::default();
    let mut h = house(&cfg);
    h.register(Box::new(ClimateTask::new(&cfg.climate)));
    h.start();
    h.hw_mut().climate = Ok(ClimateReading { temperature_c: 22.0, humidity_pct: 45.0 });

    step(&mut h, TICK);
    step(&mut h, TICK);
    step(&mut h, 60_000);
    assert_eq!(published(&h, "sensors/temperature"), ["22"]);
    assert_eq!(published(&h, "sensors/humidity"), ["45"]);

    step(&mut h, 30 * 60 * 1000);
    assert_eq!(published(&h, "sensors/temperature").len(), 2);
    assert_eq!(h.shared().climate_seq, 2);
}

#[test]
fn climate_failure_retries_next_tick() {
    let cfg = SystemConfig::default();
    let mut h = house(&cfg);
    h.register(Box::new(ClimateTask::new(&cfg.climate)));
    h.start();

    step(&mut h, TICK);
    step(&mut h, TICK);
    assert_eq!(h.hw().climate_reads, 2);
    assert!(h.shared().climate.is_none());

    h.hw_mut().climate = Ok(ClimateReading { temperature_c: 21.5, humidity_pct: 40.0 });
    step(&mut h, TICK);
    step(&mut h, TICK);
    assert_eq!(h.hw().climate_reads, 3);
    assert_eq!(published(&h, "sensors/temperature"), ["21.5"]);
    assert_eq!(h.hw().line1(), Some("Temp: 21.5C"));
    assert_eq!(h.hw().line2(), Some("Humidity: 40%"));
}

#[test]
fn asthma_alert_fires_once_and_restores_display() {
    let cfg = SystemConfig::default();
    let mut h = house(&cfg);
    h.register(Box::new(ClimateTask::new(&cfg.climate)));
    h.register(Box::new(AirQualityTask::new(&cfg.climate)));
    h.start();

    h.hw_mut().climate = Ok(ClimateReading { temperature_c: 28.0, humidity_pct: 60.0 });
    step(&mut h, TICK);
    step(&mut h, TICK);
    assert_eq!(published(&h, "events/asthma_alert"), ["1"]);
    assert_eq!(h.hw().line1(), Some(ALERT_LINE1));
    assert_eq!(h.hw().line2(), Some(ALERT_LINE2));
    assert!(h.shared().air_alert);

    h.hw_mut().climate = Ok(ClimateReading { temperature_c: 26.0, humidity_pct: 40.0 });
    step(&mut h, 30 * 60 * 1000);
    assert_eq!(published(&h, "events/asthma_alert"), ["1", "0"]);
    assert_eq!(h.hw().line1(), Some("Temp: 26C"));
    assert_eq!(h.hw().line2(), Some("Humidity: 40%"));
    assert!(!h.shared().air_alert);
}

#[test]
fn air_quality_waits_for_a_first_reading() {
    let cfg = SystemConfig::default();
    let mut h = house(&cfg);
    h.register(Box::new(AirQualityTask::new(&cfg.climate)));
    h.start();
    for _ in 0..5 {
        step(&mut h, TICK);
    }
    assert!(published(&h, "events/asthma_alert").is_empty());
    assert!(h.hw().screen.is_none());
}

// ── Illumination ──────────────────────────────────────────────

/// 2024-01-01T09:30:00Z, which is 20:30 at UTC+11.
const EVENING_UTC: i64 = 1_704_101_400;

#[test]
fn illumination_turns_led_on_in_the_evening() {
    let cfg = SystemConfig::default();
    let mut h = house(&cfg);
    h.register(Box::new(IlluminationTask::new(cfg.illumination.clone())));
    h.start();
    h.clock_mut().unix_at_boot = Some(EVENING_UTC);

    step(&mut h, TICK);
    assert!(h.hw().actuator_states().led);
    assert_eq!(published(&h, "devices/led/state"), ["on"]);

    // Throttled: nothing until the re-check window has passed.
    step(&mut h, TICK);
    assert_eq!(h.hw().count(ActuatorCall::Led(true)), 1);

    step(&mut h, 60_000);
    assert_eq!(h.hw().count(ActuatorCall::Led(true)), 2);
    assert_eq!(published(&h, "devices/led/state"), ["on"]);
}

#[test]
fn illumination_is_off_during_the_day() {
    let cfg = SystemConfig::default();
    let mut h = house(&cfg);
    h.register(Box::new(IlluminationTask::new(cfg.illumination.clone())));
    h.start();
    h.clock_mut().unix_at_boot = Some(EVENING_UTC - 12 * 3600);

    step(&mut h, TICK);
    assert!(!h.hw().actuator_states().led);
    assert_eq!(published(&h, "devices/led/state"), ["off"]);
}

#[test]
fn illumination_waits_for_wall_clock() {
    let cfg = SystemConfig::default();
    let mut h = house(&cfg);
    h.register(Box::new(IlluminationTask::new(cfg.illumination.clone())));
    h.start();

    for _ in 0..3 {
        step(&mut h, 60_000);
    }
    assert!(h.hw().calls.is_empty());

    h.clock_mut().unix_at_boot = Some(EVENING_UTC);
    step(&mut h, TICK);
    assert!(h.hw().actuator_states().led);
}

// ── Device control ────────────────────────────────────────────

#[test]
fn device_commands_drive_actuators_and_echo_state() {
    let mut h = house(&SystemConfig::default());
    h.register(Box::new(DeviceControlTask::new()));
    h.start();

    let t = h.channel_mut().transport_mut();
    t.inject(&topic("devices/door/command"), "OPEN");
    t.inject(&topic("devices/window/command"), "close");
    t.inject(&topic("devices/fan/command"), "on");
    t.inject(&topic("devices/led/command"), "on");
    t.inject(&topic("devices/fan/command"), "spin");
    step(&mut h, TICK);

    assert_eq!(
        h.hw().calls,
        [
            ActuatorCall::Door(Position::Open),
            ActuatorCall::Window(Position::Closed),
            ActuatorCall::Fan(true),
        ]
    );
    assert_eq!(published(&h, "devices/door/state"), ["open"]);
    assert_eq!(published(&h, "devices/window/state"), ["closed"]);
    assert_eq!(published(&h, "devices/fan/state"), ["on"]);
    assert_eq!(
        h.sink().count(|e| matches!(e, HomeEvent::DeviceCommanded(_))),
        3
    );
    assert!(h.sink().events.contains(&HomeEvent::DeviceCommanded(DeviceCommand::Fan(true))));
}

#[test]
fn failed_command_write_still_echoes_state() {
    let mut h = house(&SystemConfig::default());
    h.register(Box::new(DeviceControlTask::new()));
    h.start();
    h.hw_mut().fail_writes = true;

    h.channel_mut().transport_mut().inject(&topic("devices/door/command"), "open");
    step(&mut h, TICK);

    assert_eq!(h.hw().calls, [ActuatorCall::Door(Position::Open)]);
    assert_eq!(published(&h, "devices/door/state"), ["open"]);
    assert!(h.sink().events.contains(&HomeEvent::DeviceCommanded(DeviceCommand::Door(Position::Open))));
    assert_eq!(h.task_faults(), 0);
}

#[test]
fn unsubscribed_topics_never_reach_device_control() {
    let mut h = house(&SystemConfig::default());
    h.register(Box::new(DeviceControlTask::new()));
    h.start();

    h.channel_mut().transport_mut().inject("other/devices/door/command", "open");
    h.channel_mut().transport_mut().inject(&topic("devices/door/state"), "open");
    step(&mut h, TICK);
    assert!(h.hw().calls.is_empty());
}
