//! Inbound device commands.
//!
//! Commands arrive on `<root>/devices/<name>/command`. The device is picked
//! by substring match on the topic (door, then window, then fan) and the
//! payload is matched case-insensitively. Anything else is ignored.

use super::ports::Position;

/// Actuator command requested by the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    Door(Position),
    Window(Position),
    Fan(bool),
}

impl DeviceCommand {
    /// Interpret a command message. `None` for unknown devices or verbs.
    pub fn parse(topic: &str, payload: &str) -> Option<Self> {
        let verb = payload.trim();
        if topic.contains("door") {
            position(verb).map(Self::Door)
        } else if topic.contains("window") {
            position(verb).map(Self::Window)
        } else if topic.contains("fan") {
            switch(verb).map(Self::Fan)
        } else {
            None
        }
    }

    /// Name used in `devices/<name>/state`.
    pub fn device(self) -> &'static str {
        match self {
            Self::Door(_) => "door",
            Self::Window(_) => "window",
            Self::Fan(_) => "fan",
        }
    }

    /// State word echoed after the command is applied.
    pub fn state(self) -> &'static str {
        match self {
            Self::Door(p) | Self::Window(p) => p.as_str(),
            Self::Fan(true) => "on",
            Self::Fan(false) => "off",
        }
    }
}

fn position(verb: &str) -> Option<Position> {
    if verb.eq_ignore_ascii_case("open") {
        Some(Position::Open)
    } else if verb.eq_ignore_ascii_case("close") {
        Some(Position::Closed)
    } else {
        None
    }
}

fn switch(verb: &str) -> Option<bool> {
    if verb.eq_ignore_ascii_case("on") {
        Some(true)
    } else if verb.eq_ignore_ascii_case("off") {
        Some(false)
    } else {
        None
    }
}
