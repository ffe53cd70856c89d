//! Application core: port traits, events, commands, and the topic map.
//!
//! Nothing in here touches hardware. Tasks, the indicator arbiter and the
//! scheduler are written against these types so they run unchanged on the
//! host with mock adapters.

pub mod commands;
pub mod events;
pub mod ports;
pub mod topics;
