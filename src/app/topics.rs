//! Topic namespace.
//!
//! ```text
//!   <root>/sensors/<name>            periodic values
//!   <root>/events/<name>             edge-triggered "0"/"1" or flat JSON
//!   <root>/devices/<name>/state      actuator state echo
//!   <root>/devices/<name>/command    inbound commands (wildcard-subscribed)
//!   <root>/status/<kind>             online / heartbeat
//! ```

use core::fmt::Write;

pub const TOPIC_CAP: usize = 96;

/// Owned topic string.
pub type TopicBuf = heapless::String<TOPIC_CAP>;

#[derive(Debug, Clone)]
pub struct Topics {
    root: heapless::String<32>,
}

impl Topics {
    pub fn new(root: &str) -> Self {
        let mut r = heapless::String::new();
        let _ = r.push_str(root.trim_end_matches('/'));
        Self { root: r }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn sensor(&self, name: &str) -> TopicBuf {
        self.build(format_args!("{}/sensors/{}", self.root, name))
    }

    pub fn event(&self, name: &str) -> TopicBuf {
        self.build(format_args!("{}/events/{}", self.root, name))
    }

    pub fn device_state(&self, name: &str) -> TopicBuf {
        self.build(format_args!("{}/devices/{}/state", self.root, name))
    }

    pub fn device_command(&self, name: &str) -> TopicBuf {
        self.build(format_args!("{}/devices/{}/command", self.root, name))
    }

    /// Wildcard filter covering every device command topic.
    pub fn all_commands(&self) -> TopicBuf {
        self.device_command("+")
    }

    pub fn status(&self, kind: &str) -> TopicBuf {
        self.build(format_args!("{}/status/{}", self.root, kind))
    }

    fn build(&self, args: core::fmt::Arguments<'_>) -> TopicBuf {
        let mut out = TopicBuf::new();
        if out.write_fmt(args).is_err() {
            // Names are compile-time constants; only a pathological root
            // can overflow, and a truncated topic simply matches nothing.
            log::warn!("Topics: '{}' truncated", out);
        }
        out
    }
}

/// MQTT filter matching: `+` matches exactly one level, a trailing `#`
/// matches the remaining levels (including none).
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut f = filter.split('/');
    let mut t = topic.split('/');
    loop {
        match (f.next(), t.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(a), Some(b)) if a == b => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
