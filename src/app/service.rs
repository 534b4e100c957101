//! Monitor service — the hexagonal core.
//!
//! [`MonitorService`] owns the [`VibrationStateMachine`] and sequences one
//! poll tick.  All I/O flows through port traits injected at call sites,
//! making the service testable with mock adapters.
//!
//! ```text
//!  EdgeSource ──▶ ┌────────────────────────┐ ──▶ TransitionPublisher
//!                 │     MonitorService     │
//!                 │  VibrationStateMachine │ ──▶ EventSink
//!                 └────────────────────────┘
//! ```

use core::time::Duration;

use log::{info, warn};

use crate::fsm::{Timestamp, Transition, VibrationState, VibrationStateMachine};

use super::events::AppEvent;
use super::ports::{EdgeSource, EventSink, TransitionPublisher};

/// The application service orchestrates all domain logic.
pub struct MonitorService {
    fsm: VibrationStateMachine,
    tick_count: u64,
    transition_count: u64,
    sensor_faults: u64,
}

impl MonitorService {
    /// Construct the service stopped, with its window starting at `now`.
    pub fn new(now: Timestamp, hysteresis: Duration) -> Self {
        Self {
            fsm: VibrationStateMachine::new(now, hysteresis),
            tick_count: 0,
            transition_count: 0,
            sensor_faults: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Announce the initial state.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        let state = self.fsm.state();
        sink.emit(&AppEvent::Started {
            running: state.is_running,
            at: state.last_pulse_at,
        });
        info!(
            "MonitorService started (hysteresis {}s)",
            self.fsm.hysteresis().as_secs()
        );
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one poll tick: read edge → evaluate → publish.
    ///
    /// A sensor failure is reported and treated as "no edge".  The
    /// publisher is invoked exactly once per returned transition and never
    /// otherwise.
    pub fn tick<E, P, S>(
        &mut self,
        now: Timestamp,
        edges: &mut E,
        publisher: &mut P,
        sink: &mut S,
    ) -> Option<Transition>
    where
        E: EdgeSource + ?Sized,
        P: TransitionPublisher + ?Sized,
        S: EventSink + ?Sized,
    {
        self.tick_count += 1;

        let edge_detected = match edges.poll_edge_detected() {
            Ok(edge) => edge,
            Err(error) => {
                self.sensor_faults += 1;
                warn!("Edge read failed at {}: {}", now, error);
                sink.emit(&AppEvent::SensorFault { error, at: now });
                false
            }
        };

        let transition = self.fsm.evaluate(now, edge_detected)?;
        self.transition_count += 1;
        publisher.publish(&transition);
        sink.emit(&AppEvent::Transition(transition));
        Some(transition)
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current debounced running flag.
    pub fn is_running(&self) -> bool {
        self.fsm.is_running()
    }

    /// Snapshot of the in-memory state.
    pub fn state(&self) -> VibrationState {
        self.fsm.state()
    }

    /// Total poll ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Transitions published since startup.
    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    /// Ticks on which the edge source failed.
    pub fn sensor_fault_count(&self) -> u64 {
        self.sensor_faults
    }
}
