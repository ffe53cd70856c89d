//! Scheduler loop: ordering, fault isolation, link recovery, heartbeat,
//! overrun accounting and shutdown safing.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

use smarthouse::app::events::HomeEvent;
use smarthouse::app::ports::{ActuatorPort, Position, Rgb};
use smarthouse::config::SystemConfig;
use smarthouse::indicator::Owner;
use smarthouse::tasks::{
    AccessControlTask, DeviceControlTask, IlluminationTask, MoistureTask, OccupancyTask, Task,
    TaskContext,
};

use crate::mock_hw::{ActuatorCall, House, house, step, topic};

const TICK: u64 = 500;

/// Appends its name to a shared log on every update.
struct Tracer {
    name: &'static str,
    log: Rc<RefCell<Vec<&'static str>>>,
}

impl Task for Tracer {
    fn name(&self) -> &'static str {
        self.name
    }

    fn update(&mut self, _ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        self.log.borrow_mut().push(self.name);
        Ok(())
    }
}

struct Failing;

impl Task for Failing {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn update(&mut self, _ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        anyhow::bail!("sensor bus wedged")
    }
}

/// Burns `ms` of clock time on every update.
struct Slow(u32);

impl Task for Slow {
    fn name(&self) -> &'static str {
        "slow"
    }

    fn update(&mut self, ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        ctx.clock.delay_ms(self.0);
        Ok(())
    }
}

fn faults(h: &House) -> usize {
    h.sink().count(|e| matches!(e, HomeEvent::TaskFault { .. }))
}

// ── Ordering + start ──────────────────────────────────────────

#[test]
fn tasks_run_in_registration_order() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut h = house(&SystemConfig::default());
    for name in ["first", "second", "third"] {
        h.register(Box::new(Tracer { name, log: log.clone() }));
    }
    h.start();
    step(&mut h, TICK);
    step(&mut h, TICK);

    assert_eq!(*log.borrow(), ["first", "second", "third", "first", "second", "third"]);
    assert_eq!(h.ticks(), 2);
}

#[test]
fn start_announces_and_connects_once() {
    let mut h = house(&SystemConfig::default());
    h.register(Box::new(OccupancyTask::new()));
    h.register(Box::new(DeviceControlTask::new()));
    h.start();
    h.start();

    assert_eq!(h.sink().events[0], HomeEvent::Started { tasks: 2 });
    assert_eq!(h.sink().count(|e| matches!(e, HomeEvent::Started { .. })), 1);
    assert_eq!(h.sink().count(|e| *e == HomeEvent::LinkUp), 1);
    assert_eq!(h.channel().transport().connect_attempts(), 1);
    assert_eq!(h.channel().transport().payloads_on(&topic("status/online")), ["online"]);
    assert_eq!(
        h.channel().transport().subscriptions(),
        [topic("devices/+/command")]
    );
}

// ── Fault isolation ───────────────────────────────────────────

#[test]
fn failing_task_does_not_stop_the_tick() {
    let mut h = house(&SystemConfig::default());
    h.register(Box::new(Failing));
    h.register(Box::new(MoistureTask::new(&SystemConfig::default().moisture)));
    h.start();

    h.hw_mut().moisture = Ok(3000);
    step(&mut h, TICK);
    step(&mut h, TICK);

    assert_eq!(h.task_faults(), 2);
    assert_eq!(faults(&h), 2);
    assert!(h.sink().events.contains(&HomeEvent::TaskFault { task: "failing" }));
    assert_eq!(h.indicator().current_owner(), Some(Owner::Moisture));
    assert_eq!(h.hw().count(ActuatorCall::Window(Position::Closed)), 1);
}

#[cfg(panic = "unwind")]
#[test]
fn panicking_task_is_contained() {
    let mut h = house(&SystemConfig::default());
    h.register(Box::new(OccupancyTask::new()));
    h.register(Box::new(MoistureTask::new(&SystemConfig::default().moisture)));
    h.start();

    h.hw_mut().panic_on_motion = true;
    h.hw_mut().moisture = Ok(3000);
    step(&mut h, TICK);

    assert_eq!(h.task_faults(), 1);
    assert!(h.sink().events.contains(&HomeEvent::TaskFault { task: "occupancy" }));
    assert_eq!(h.hw().rgb_writes(), [Rgb::BLUE]);

    // Next tick the occupancy task runs normally again.
    h.hw_mut().panic_on_motion = false;
    h.hw_mut().motion = Ok(true);
    step(&mut h, TICK);
    assert_eq!(h.task_faults(), 1);
    assert_eq!(
        h.channel().transport().payloads_on(&topic("events/motion_detected")),
        ["1"]
    );
}

// ── Link recovery ─────────────────────────────────────────────

#[test]
fn broker_outage_retries_every_tick_and_recovers() {
    let mut h = house(&SystemConfig::default());
    h.register(Box::new(OccupancyTask::new()));
    h.register(Box::new(DeviceControlTask::new()));
    h.channel_mut().transport_mut().set_broker_up(false);
    h.start();

    assert!(!h.channel().is_connected());
    assert_eq!(h.sink().count(|e| *e == HomeEvent::LinkUp), 0);

    h.hw_mut().motion = Ok(true);
    step(&mut h, TICK);
    step(&mut h, TICK);
    step(&mut h, TICK);
    assert_eq!(h.channel().transport().connect_attempts(), 4);
    assert_eq!(h.channel().dropped(), 1);

    // Sensing carried on while offline.
    assert_eq!(h.indicator().current_owner(), Some(Owner::Occupancy));

    h.channel_mut().transport_mut().set_broker_up(true);
    step(&mut h, TICK);
    assert!(h.channel().is_connected());
    assert_eq!(h.sink().count(|e| *e == HomeEvent::LinkUp), 1);
    assert_eq!(
        h.channel().transport().subscriptions(),
        [topic("devices/+/command")]
    );

    // Lost mid-session: detected, announced, and retried.
    h.channel_mut().transport_mut().set_broker_up(false);
    h.hw_mut().motion = Ok(false);
    step(&mut h, TICK);
    assert!(!h.channel().is_connected());
    assert_eq!(h.sink().count(|e| *e == HomeEvent::LinkDown), 1);
    assert_eq!(h.channel().dropped(), 2);

    h.channel_mut().transport_mut().set_broker_up(true);
    step(&mut h, TICK);
    assert!(h.channel().is_connected());
    assert_eq!(h.sink().count(|e| *e == HomeEvent::LinkUp), 2);
    assert_eq!(
        h.channel().transport().payloads_on(&topic("status/online")),
        ["online", "online"]
    );

    // Commands flow again after the reconnect.
    h.channel_mut().transport_mut().inject(&topic("devices/fan/command"), "on");
    step(&mut h, TICK);
    assert!(h.hw().actuator_states().fan);
}

#[test]
fn poll_failure_drops_then_restores_the_link() {
    let mut h = house(&SystemConfig::default());
    h.register(Box::new(DeviceControlTask::new()));
    h.start();

    h.channel_mut().transport_mut().fail_next_poll();
    step(&mut h, TICK);

    // Dropped in the pump step, reconnected in the same tick.
    assert!(h.channel().is_connected());
    assert_eq!(h.channel().transport().connect_attempts(), 2);
}

// ── Heartbeat ─────────────────────────────────────────────────

#[test]
fn heartbeat_published_on_interval() {
    let mut cfg = SystemConfig::default();
    cfg.heartbeat_interval_secs = 1;
    let mut h = house(&cfg);
    h.register(Box::new(OccupancyTask::new()));
    h.start();

    step(&mut h, TICK);
    assert!(h.channel().transport().payloads_on(&topic("status/heartbeat")).is_empty());
    step(&mut h, TICK);

    let beats = h.channel().transport().payloads_on(&topic("status/heartbeat"));
    assert_eq!(beats.len(), 1);
    let beat: serde_json::Value = serde_json::from_str(beats[0]).unwrap();
    assert_eq!(beat["ticks"], 2);
    assert_eq!(beat["uptime_secs"], 1);
    assert_eq!(beat["connected"], true);
    assert_eq!(h.sink().count(|e| matches!(e, HomeEvent::Heartbeat(_))), 1);
}

#[test]
fn heartbeat_zero_interval_is_disabled() {
    let mut cfg = SystemConfig::default();
    cfg.heartbeat_interval_secs = 0;
    let mut h = house(&cfg);
    h.start();
    for _ in 0..10 {
        step(&mut h, 60_000);
    }
    assert!(h.channel().transport().payloads_on(&topic("status/heartbeat")).is_empty());
}

// ── run loop ──────────────────────────────────────────────────

#[test]
fn run_sleeps_out_the_rest_of_each_tick() {
    let mut h = house(&SystemConfig::default());
    h.register(Box::new(Slow(120)));

    let stop = AtomicBool::new(false);
    let mut after = 0;
    h.run_with(&stop, || {
        after += 1;
        if after == 3 {
            stop.store(true, Ordering::Relaxed);
        }
    });

    assert_eq!(h.ticks(), 3);
    assert_eq!(h.overruns(), 0);
    // Each tick: the task's own delay, then the remainder of the budget.
    assert_eq!(h.clock().delays_ms, [120, 380, 120, 380, 120, 380]);
}

#[test]
fn overrunning_ticks_are_counted_not_slept() {
    let mut h = house(&SystemConfig::default());
    h.register(Box::new(Slow(700)));

    let stop = AtomicBool::new(false);
    let mut after = 0;
    h.run_with(&stop, || {
        after += 1;
        if after == 4 {
            stop.store(true, Ordering::Relaxed);
        }
    });

    assert_eq!(h.overruns(), 4);
    assert_eq!(h.clock().delays_ms, [700; 4]);
    assert_eq!(h.heartbeat().overruns, 4);
}

#[test]
fn stopped_run_shuts_down() {
    let mut h = house(&SystemConfig::default());
    h.register(Box::new(OccupancyTask::new()));

    let stop = AtomicBool::new(true);
    h.run(&stop);

    assert_eq!(h.ticks(), 0);
    assert!(h.sink().events.contains(&HomeEvent::ShuttingDown));
    assert!(!h.channel().is_connected());
    assert_eq!(
        h.channel().transport().payloads_on(&topic("status/online")),
        ["online", "offline"]
    );
}

// ── Shutdown ──────────────────────────────────────────────────

#[test]
fn shutdown_safes_everything() {
    let cfg = SystemConfig::default();
    let mut h = house(&cfg);
    h.register(Box::new(IlluminationTask::new(cfg.illumination.clone())));
    h.register(Box::new(DeviceControlTask::new()));
    h.start();

    let t = h.channel_mut().transport_mut();
    t.inject(&topic("devices/door/command"), "open");
    t.inject(&topic("devices/fan/command"), "on");
    step(&mut h, TICK);
    h.hw_mut().screen = Some(("hello".into(), "world".into()));

    h.shutdown();

    let s = h.hw().actuator_states();
    assert!(!s.fan && !s.led && !s.buzzer);
    assert_eq!(s.door, Position::Closed);
    assert_eq!(s.window, Position::Closed);
    assert_eq!(s.rgb, Rgb::OFF);
    assert!(h.hw().screen.is_none());
    assert_eq!(h.channel().transport().disconnects(), 1);
}

#[test]
fn shutdown_attempts_every_step_when_writes_fail() {
    let cfg = SystemConfig::default();
    let mut h = house(&cfg);
    h.register(Box::new(DeviceControlTask::new()));
    h.start();
    h.hw_mut().fail_writes = true;

    h.shutdown();

    let calls = &h.hw().calls;
    for expected in [
        ActuatorCall::Door(Position::Closed),
        ActuatorCall::Window(Position::Closed),
        ActuatorCall::Fan(false),
        ActuatorCall::Buzzer(false),
        ActuatorCall::Led(false),
        ActuatorCall::Rgb(Rgb::OFF),
    ] {
        assert!(calls.contains(&expected), "missing {:?}", expected);
    }
    // Cleanup itself tries every write before safe-all repeats them.
    assert_eq!(h.hw().count(ActuatorCall::Fan(false)), 2);
    assert_eq!(h.hw().count(ActuatorCall::Door(Position::Closed)), 2);
    assert_eq!(h.hw().count(ActuatorCall::Window(Position::Closed)), 2);
    // The failing cleanup is counted but does not abort shutdown.
    assert_eq!(h.task_faults(), 1);
    assert_eq!(
        h.channel().transport().payloads_on(&topic("status/online")),
        ["online", "offline"]
    );
}

#[test]
fn access_cleanup_tries_buzzer_and_door() {
    let cfg = SystemConfig::default();
    let mut h = house(&cfg);
    h.register(Box::new(AccessControlTask::new(cfg.access.clone())));
    h.start();
    h.hw_mut().fail_writes = true;

    h.shutdown();

    assert_eq!(h.hw().count(ActuatorCall::Buzzer(false)), 2);
    assert_eq!(h.hw().count(ActuatorCall::Door(Position::Closed)), 2);
    assert_eq!(h.task_faults(), 1);
}
