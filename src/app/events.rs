//! Outbound application events.
//!
//! The [`MonitorService`](super::service::MonitorService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them.

use crate::error::SensorError;
use crate::fsm::{Timestamp, Transition};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The monitor has started (carries the initial running flag).
    Started { running: bool, at: Timestamp },

    /// The debounced signal changed.
    Transition(Transition),

    /// The edge source failed this tick; treated as no edge.
    SensorFault { error: SensorError, at: Timestamp },
}
