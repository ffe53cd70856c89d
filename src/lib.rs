//! Smart house controller firmware library.
//!
//! Exposes the orchestration core (scheduler, tasks, indicator arbiter,
//! broker channel) and its port traits for integration testing. All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod indicator;
pub mod scheduler;
pub mod tasks;

pub mod pins;

pub mod adapters;
pub mod drivers;
pub mod sensors;
