//! The shared RGB strip as seen from several tasks at once.

use smarthouse::app::ports::{ActuatorPort, Rgb};
use smarthouse::config::SystemConfig;
use smarthouse::indicator::Owner;
use smarthouse::tasks::{GasTask, MoistureTask, OccupancyTask};

use crate::mock_hw::{House, house, step};

const TICK: u64 = 500;

fn sensing_house() -> House {
    let mut cfg = SystemConfig::default();
    cfg.gas.warmup_secs = 0;
    cfg.gas.debounce_count = 1;
    let mut h = house(&cfg);
    h.register(Box::new(OccupancyTask::new()));
    h.register(Box::new(MoistureTask::new(&cfg.moisture)));
    h.register(Box::new(GasTask::new(&cfg.gas, 0)));
    h.start();
    h
}

#[test]
fn occupancy_then_moisture_then_clear() {
    let mut h = sensing_house();

    h.hw_mut().motion = Ok(true);
    step(&mut h, TICK);
    assert_eq!(h.indicator().current_owner(), Some(Owner::Occupancy));

    h.hw_mut().moisture = Ok(2500);
    step(&mut h, TICK);
    assert_eq!(h.indicator().current_owner(), Some(Owner::Moisture));

    h.hw_mut().moisture = Ok(100);
    step(&mut h, TICK);
    assert_eq!(h.indicator().current_owner(), Some(Owner::Occupancy));

    h.hw_mut().motion = Ok(false);
    step(&mut h, TICK);
    assert_eq!(h.indicator().current_owner(), None);

    assert_eq!(
        h.hw().rgb_writes(),
        [Rgb::ORANGE, Rgb::BLUE, Rgb::ORANGE, Rgb::OFF]
    );
}

#[test]
fn lower_priority_waits_behind_gas() {
    let mut h = sensing_house();

    h.hw_mut().gas = Ok(true);
    step(&mut h, TICK);
    h.hw_mut().motion = Ok(true);
    h.hw_mut().moisture = Ok(3000);
    step(&mut h, TICK);
    assert_eq!(h.hw().rgb_writes(), [Rgb::RED]);

    // Releasing a claim that is not shown leaves the strip alone.
    h.hw_mut().moisture = Ok(0);
    step(&mut h, TICK);
    assert_eq!(h.hw().rgb_writes(), [Rgb::RED]);

    // Gas clears: the strongest remaining claim takes over.
    h.hw_mut().gas = Ok(false);
    step(&mut h, TICK);
    assert_eq!(h.indicator().current_owner(), Some(Owner::Occupancy));
    assert_eq!(h.hw().rgb_writes(), [Rgb::RED, Rgb::ORANGE]);
}

#[test]
fn strip_always_shows_the_current_colour() {
    let mut h = sensing_house();
    let script = [
        (true, 0, false),
        (true, 3000, false),
        (true, 3000, true),
        (false, 3000, true),
        (false, 0, true),
        (false, 0, false),
    ];
    for (motion, moisture, gas) in script {
        h.hw_mut().motion = Ok(motion);
        h.hw_mut().moisture = Ok(moisture);
        h.hw_mut().gas = Ok(gas);
        step(&mut h, TICK);
        assert_eq!(h.hw().actuator_states().rgb, h.indicator().current_colour());
    }
    assert_eq!(h.indicator().current_owner(), None);
    assert_eq!(h.hw().actuator_states().rgb, Rgb::OFF);
}
