//! Application core — domain logic behind port traits.
//!
//! This module contains the business rules for SpinWatch: per-tick
//! sequencing around the vibration state machine and the off-loop
//! execution of transition side effects.  All interaction with hardware
//! and the network happens through **port traits** defined in [`ports`],
//! keeping this layer fully testable without real peripherals.

pub mod effects;
pub mod events;
pub mod ports;
pub mod service;
