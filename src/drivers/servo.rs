//! Hobby servos for the door and window (LEDC, 50 Hz, 10-bit).
//!
//! 0.5 ms to 2.5 ms pulse over a 20 ms frame maps to 0° to 180°, which at
//! 10-bit resolution is duty 26 to 128.

use serde::{Deserialize, Serialize};

use crate::drivers::hw_init;
use crate::error::ActuatorError;

const DUTY_MIN: u32 = 26;
const DUTY_SPAN: u32 = 102;
const ANGLE_MAX: u8 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Open,
    #[default]
    Closed,
}

impl Position {
    pub fn angle(self) -> u8 {
        match self {
            Self::Open => ANGLE_MAX,
            Self::Closed => 0,
        }
    }

    /// State word echoed on `devices/<name>/state`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

pub fn angle_to_duty(angle: u8) -> u32 {
    DUTY_MIN + u32::from(angle.min(ANGLE_MAX)) * DUTY_SPAN / u32::from(ANGLE_MAX)
}

pub struct Servo {
    channel: u32,
    position: Position,
}

impl Servo {
    pub fn new(channel: u32) -> Self {
        Self {
            channel,
            position: Position::Closed,
        }
    }

    pub fn set(&mut self, position: Position) -> Result<(), ActuatorError> {
        self.position = position;
        hw_init::ledc_set(self.channel, angle_to_duty(position.angle()))
    }

    pub fn position(&self) -> Position {
        self.position
    }
}
