//! SpinWatch firmware library.
//!
//! Debounces a vibration sensor into a running/stopped signal, publishes
//! each change to persistent storage and a webhook, and serves the last
//! published state.  Everything here builds and tests on the host; all
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod fsm;
pub mod poll_loop;
pub mod status;
