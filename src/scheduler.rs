//! Fixed-rate scheduler.
//!
//! Owns the board, the clock, the broker channel, the event sink and the
//! indicator arbiter, and drives every registered [`Task`] from a single
//! thread of control.
//!
//! ```text
//! ┌──────────────────────────── one tick ─────────────────────────────┐
//! │                                                                   │
//! │  1. task.update()        for every task, insertion order          │
//! │  2. channel.pump()       ≤ INBOX_CAP messages, non-blocking       │
//! │       └─ task.on_message()  for every task whose filter matches   │
//! │  3. channel.connect()    only while the link is down              │
//! │  4. LinkUp / LinkDown    on a change of the connected flag        │
//! │  5. heartbeat            every `heartbeat_interval_secs`          │
//! │                                                                   │
//! └─────────────── sleep(tick_interval - elapsed) ────────────────────┘
//! ```
//!
//! A task that returns an error or panics is logged and counted; the tick
//! carries on with the next task. Nothing in the steady-state loop is
//! fatal. The only way out is the stop flag, after which [`Scheduler::shutdown`]
//! safes every actuator and closes the broker session.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, error, info, warn};

use crate::app::events::{HeartbeatData, HomeEvent};
use crate::app::ports::{ClockPort, EventSink, Hardware, Publisher};
use crate::app::topics::{Topics, topic_matches};
use crate::config::SystemConfig;
use crate::connectivity::{Channel, Transport};
use crate::indicator::IndicatorArbiter;
use crate::tasks::{SharedState, Subscriptions, Task, TaskContext};

// ═══════════════════════════════════════════════════════════════
//  Registration
// ═══════════════════════════════════════════════════════════════

/// A task plus the filters it declared at registration.
struct Registered {
    task: Box<dyn Task>,
    filters: Subscriptions,
}

/// Run `f`, turning an `Err` into a logged `false`. A panic is caught the
/// same way only when panics unwind; with `panic = "abort"` it resets the
/// board and `catch_unwind` never returns.
fn guarded(task: &str, stage: &str, f: impl FnOnce() -> anyhow::Result<()>) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!("Scheduler: {} {} failed: {:#}", task, stage, e);
            false
        }
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                .unwrap_or("<non-string panic>");
            error!("Scheduler: {} {} panicked: {}", task, stage, msg);
            false
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

pub struct Scheduler<H, C, T, S>
where
    H: Hardware,
    C: ClockPort,
    T: Transport,
    S: EventSink,
{
    hw: H,
    clock: C,
    channel: Channel<T>,
    sink: S,
    indicator: IndicatorArbiter,
    topics: Topics,
    shared: SharedState,
    tasks: Vec<Registered>,

    tick_interval_ms: u32,
    heartbeat_interval_ms: u64,
    last_heartbeat_ms: u64,

    started: bool,
    was_connected: bool,
    ticks: u64,
    task_faults: u32,
    overruns: u32,
}

impl<H, C, T, S> Scheduler<H, C, T, S>
where
    H: Hardware,
    C: ClockPort,
    T: Transport,
    S: EventSink,
{
    pub fn new(cfg: &SystemConfig, hw: H, clock: C, transport: T, sink: S) -> Self {
        let topics = Topics::new(&cfg.topic_root);
        let channel = Channel::new(transport, topics.status("online"));
        Self {
            hw,
            clock,
            channel,
            sink,
            indicator: IndicatorArbiter::new(),
            topics,
            shared: SharedState::default(),
            tasks: Vec::new(),
            tick_interval_ms: cfg.tick_interval_ms,
            heartbeat_interval_ms: u64::from(cfg.heartbeat_interval_secs) * 1000,
            last_heartbeat_ms: 0,
            started: false,
            was_connected: false,
            ticks: 0,
            task_faults: 0,
            overruns: 0,
        }
    }

    /// Add a task. Tasks run in registration order.
    pub fn register(&mut self, task: Box<dyn Task>) {
        let filters = task.subscriptions(&self.topics);
        for f in &filters {
            self.channel.register_filter(f);
        }
        info!("Scheduler: registered '{}' ({} filters)", task.name(), filters.len());
        self.tasks.push(Registered { task, filters });
    }

    /// First connect attempt and the `Started` event. Idempotent.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.last_heartbeat_ms = self.clock.uptime_ms();
        info!("Scheduler: starting {} tasks, tick {} ms", self.tasks.len(), self.tick_interval_ms);
        self.sink.emit(&HomeEvent::Started { tasks: self.tasks.len() });
        if cfg!(panic = "abort") {
            warn!("Scheduler: panics abort on this build, a task panic resets the board");
        }
        if !self.channel.connect() {
            warn!("Scheduler: broker unreachable, retrying every tick");
        }
        self.note_link_change();
    }

    /// One iteration: updates, pump + dispatch, reconnect, heartbeat.
    pub fn tick(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
        self.run_updates();
        self.pump_and_dispatch();

        if !self.channel.is_connected() {
            self.channel.connect();
        }
        self.note_link_change();
        self.maybe_heartbeat();
    }

    /// Tick at the configured cadence until `stop` is set, then shut down.
    pub fn run(&mut self, stop: &AtomicBool) {
        self.run_with(stop, || {});
    }

    /// As [`run`](Self::run), calling `after_tick` once per tick (the
    /// binary feeds its watchdog here).
    pub fn run_with(&mut self, stop: &AtomicBool, mut after_tick: impl FnMut()) {
        self.start();
        let budget = u64::from(self.tick_interval_ms);
        while !stop.load(Ordering::Relaxed) {
            let began = self.clock.uptime_ms();
            self.tick();
            after_tick();

            let elapsed = self.clock.uptime_ms().saturating_sub(began);
            if elapsed > budget {
                self.overruns = self.overruns.saturating_add(1);
                debug!("Scheduler: tick {} overran ({} ms)", self.ticks, elapsed);
            } else {
                // Fits in u32: budget is a u32.
                self.clock.delay_ms((budget - elapsed) as u32);
            }
        }
        self.shutdown();
    }

    /// Best-effort safing: every task's cleanup, then all actuators off,
    /// indicator dark, display cleared, broker session closed. Every step
    /// is attempted even if an earlier one failed.
    pub fn shutdown(&mut self) {
        info!("Scheduler: shutting down");
        self.sink.emit(&HomeEvent::ShuttingDown);

        let Self { hw, clock, channel, sink, indicator, topics, shared, tasks, task_faults, .. } = self;
        for entry in tasks.iter_mut() {
            let mut ctx = TaskContext {
                hw: &mut *hw,
                indicator: &mut *indicator,
                link: &mut *channel,
                clock: &mut *clock,
                sink: &mut *sink,
                topics: &*topics,
                shared: &mut *shared,
            };
            let name = entry.task.name();
            if !guarded(name, "cleanup", || entry.task.cleanup(&mut ctx)) {
                *task_faults = task_faults.saturating_add(1);
            }
        }

        let failed = self.hw.safe_all();
        if failed > 0 {
            warn!("Scheduler: {} actuator(s) could not be safed", failed);
        }
        self.indicator.reset(&mut self.hw);
        if self.hw.is_available() {
            if let Err(e) = self.hw.clear() {
                warn!("Display: clear failed: {}", e);
            }
        }
        self.channel.disconnect();
        self.started = false;
        info!("Scheduler: stopped after {} ticks", self.ticks);
    }

    fn run_updates(&mut self) {
        let Self { hw, clock, channel, sink, indicator, topics, shared, tasks, task_faults, .. } = self;
        for entry in tasks.iter_mut() {
            let mut ctx = TaskContext {
                hw: &mut *hw,
                indicator: &mut *indicator,
                link: &mut *channel,
                clock: &mut *clock,
                sink: &mut *sink,
                topics: &*topics,
                shared: &mut *shared,
            };
            let name = entry.task.name();
            if !guarded(name, "update", || entry.task.update(&mut ctx)) {
                *task_faults = task_faults.saturating_add(1);
                ctx.emit(HomeEvent::TaskFault { task: name });
            }
        }
    }

    fn pump_and_dispatch(&mut self) {
        let inbox = self.channel.pump();
        if inbox.is_empty() {
            return;
        }
        let Self { hw, clock, channel, sink, indicator, topics, shared, tasks, task_faults, .. } = self;
        for msg in &inbox {
            let mut delivered = false;
            for entry in tasks.iter_mut() {
                if !entry.filters.iter().any(|f| topic_matches(f, &msg.topic)) {
                    continue;
                }
                delivered = true;
                let mut ctx = TaskContext {
                    hw: &mut *hw,
                    indicator: &mut *indicator,
                    link: &mut *channel,
                    clock: &mut *clock,
                    sink: &mut *sink,
                    topics: &*topics,
                    shared: &mut *shared,
                };
                let name = entry.task.name();
                if !guarded(name, "on_message", || entry.task.on_message(msg, &mut ctx)) {
                    *task_faults = task_faults.saturating_add(1);
                    ctx.emit(HomeEvent::TaskFault { task: name });
                }
            }
            if !delivered {
                debug!("Scheduler: no task for '{}'", msg.topic);
            }
        }
    }

    fn note_link_change(&mut self) {
        let up = self.channel.is_connected();
        if up == self.was_connected {
            return;
        }
        self.was_connected = up;
        if up {
            info!("Scheduler: link up");
            self.sink.emit(&HomeEvent::LinkUp);
        } else {
            warn!("Scheduler: link down");
            self.sink.emit(&HomeEvent::LinkDown);
        }
    }

    fn maybe_heartbeat(&mut self) {
        if self.heartbeat_interval_ms == 0 {
            return;
        }
        let now = self.clock.uptime_ms();
        if now.saturating_sub(self.last_heartbeat_ms) < self.heartbeat_interval_ms {
            return;
        }
        self.last_heartbeat_ms = now;

        let data = self.heartbeat();
        self.sink.emit(&HomeEvent::Heartbeat(data));
        match serde_json::to_string(&data) {
            Ok(json) => {
                let topic = self.topics.status("heartbeat");
                self.channel.publish(&topic, &json);
            }
            Err(e) => warn!("Scheduler: heartbeat encode failed: {}", e),
        }
    }

    /// Current liveness snapshot.
    pub fn heartbeat(&self) -> HeartbeatData {
        HeartbeatData {
            uptime_secs: self.clock.uptime_ms() / 1000,
            ticks: self.ticks,
            task_faults: self.task_faults,
            overruns: self.overruns,
            connected: self.channel.is_connected(),
            published: self.channel.published(),
            dropped: self.channel.dropped(),
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn hw(&self) -> &H {
        &self.hw
    }

    pub fn hw_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn channel(&self) -> &Channel<T> {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut Channel<T> {
        &mut self.channel
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn indicator(&self) -> &IndicatorArbiter {
        &self.indicator
    }

    pub fn shared(&self) -> &SharedState {
        &self.shared
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn task_faults(&self) -> u32 {
        self.task_faults
    }

    pub fn overruns(&self) -> u32 {
        self.overruns
    }
}
