//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink {
    emitted: u64,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events written since creation.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        self.emitted += 1;
        match event {
            AppEvent::Started { running, at } => {
                info!("START | running={} | t={}", running, at);
            }
            AppEvent::Transition(t) => {
                info!(
                    "STATE | {} | running={} | t={}",
                    t.kind.message(),
                    t.kind.is_running(),
                    t.at
                );
            }
            AppEvent::SensorFault { error, at } => {
                warn!("FAULT | sensor: {} | t={}", error, at);
            }
        }
    }
}
