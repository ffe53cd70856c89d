//! Fuzz target: inbound command path (`InboundMessage` -> `DeviceCommand`).
//!
//! The first byte picks where the topic/payload split falls; both halves
//! are fed through the same conversions the scheduler uses.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - A parsed command always echoes a state word its device accepts
//!
//! cargo fuzz run fuzz_device_command

#![no_main]

use libfuzzer_sys::fuzz_target;
use smarthouse::app::commands::DeviceCommand;
use smarthouse::app::topics::topic_matches;
use smarthouse::connectivity::InboundMessage;

fuzz_target!(|data: &[u8]| {
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let at = usize::from(split).min(rest.len());
    let (topic, payload) = rest.split_at(at);
    let Ok(topic) = core::str::from_utf8(topic) else {
        return;
    };

    let Some(msg) = InboundMessage::from_bytes(topic, payload) else {
        return;
    };
    let _ = topic_matches("ks5009/house/devices/+/command", &msg.topic);

    if let Some(cmd) = DeviceCommand::parse(&msg.topic, &msg.payload) {
        let state = cmd.state();
        assert!(matches!(state, "open" | "closed" | "on" | "off"));
        assert!(msg.topic.contains(cmd.device()));
    }
});
