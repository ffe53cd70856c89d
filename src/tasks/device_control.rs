//! Remote actuator commands from `<root>/devices/+/command`.

use log::{debug, info, warn};

use crate::app::commands::DeviceCommand;
use crate::app::events::HomeEvent;
use crate::app::ports::Position;
use crate::app::topics::Topics;
use crate::connectivity::InboundMessage;

use super::{Subscriptions, Task, TaskContext, attempt_each, subscriptions};

#[derive(Default)]
pub struct DeviceControlTask {
    applied: u32,
}

impl DeviceControlTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands applied so far.
    pub fn applied(&self) -> u32 {
        self.applied
    }
}

impl Task for DeviceControlTask {
    fn name(&self) -> &'static str {
        "device_control"
    }

    fn subscriptions(&self, topics: &Topics) -> Subscriptions {
        subscriptions([topics.all_commands()])
    }

    fn update(&mut self, _ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_message(&mut self, msg: &InboundMessage, ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        let Some(cmd) = DeviceCommand::parse(&msg.topic, &msg.payload) else {
            debug!("DeviceControl: ignoring {} = '{}'", msg.topic, msg.payload);
            return Ok(());
        };
        info!("DeviceControl: {} -> {}", cmd.device(), cmd.state());

        let result = match cmd {
            DeviceCommand::Door(p) => ctx.hw.set_door(p),
            DeviceCommand::Window(p) => ctx.hw.set_window(p),
            DeviceCommand::Fan(on) => ctx.hw.set_fan(on),
        };
        if let Err(e) = result {
            warn!("DeviceControl: {} write failed: {}", cmd.device(), e);
        }

        self.applied = self.applied.wrapping_add(1);
        ctx.publish_device_state(cmd.device(), cmd.state());
        ctx.emit(HomeEvent::DeviceCommanded(cmd));
        Ok(())
    }

    fn cleanup(&mut self, ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        attempt_each(
            self.name(),
            [
                ("fan", ctx.hw.set_fan(false)),
                ("door", ctx.hw.set_door(Position::Closed)),
                ("window", ctx.hw.set_window(Position::Closed)),
            ],
        )
    }
}
