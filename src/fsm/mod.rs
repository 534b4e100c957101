//! Vibration debouncing state machine.
//!
//! Converts coalesced edge observations, sampled once per poll tick, into
//! a hysteresis-protected running / stopped signal:
//!
//! ```text
//!              edge && window elapsed
//!   ┌─────────┐ ──────────────────────▶ ┌─────────┐
//!   │ Stopped │                         │ Running │ ◀─┐ edge (sustain:
//!   └─────────┘ ◀────────────────────── └─────────┘ ──┘  refresh pulse)
//!               no edge for >= window
//! ```
//!
//! Each tick evaluates the rules in strict priority order and the first
//! match wins: start, stop, sustain.  The stop rule is checked before the
//! sustain rule, so a pulse arriving on the very tick the window expires
//! still produces `Stopped`.
//!
//! The machine is pure: no I/O, no clock.  The caller passes `now` and
//! dispatches the returned [`Transition`].

pub mod timestamp;

use core::time::Duration;

use log::info;

pub use timestamp::Timestamp;

/// Default debounce window.
pub const DEFAULT_HYSTERESIS: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// The two externally visible changes of the debounced signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    Started,
    Stopped,
}

impl TransitionKind {
    /// Notification text for this transition.
    pub const fn message(self) -> &'static str {
        match self {
            Self::Started => "Started",
            Self::Stopped => "Stopped",
        }
    }

    /// Running flag to publish after this transition.
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Started)
    }
}

/// A confirmed change of the debounced running signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub kind: TransitionKind,
    /// Tick time at which the transition was decided.
    pub at: Timestamp,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// The debounced appliance state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VibrationState {
    /// Time of the most recent confirmed pulse (or transition).
    pub last_pulse_at: Timestamp,
    /// Current debounced running flag.
    pub is_running: bool,
}

/// Hysteresis state machine over a single vibration input.
#[derive(Debug, Clone)]
pub struct VibrationStateMachine {
    state: VibrationState,
    hysteresis: Duration,
}

impl VibrationStateMachine {
    /// Create a stopped machine whose window starts at `now`.
    pub fn new(now: Timestamp, hysteresis: Duration) -> Self {
        Self {
            state: VibrationState {
                last_pulse_at: now,
                is_running: false,
            },
            hysteresis,
        }
    }

    /// Resume from an explicit state (tests, diagnostics).
    pub fn with_state(state: VibrationState, hysteresis: Duration) -> Self {
        Self { state, hysteresis }
    }

    /// Decide whether this tick confirms a transition.
    ///
    /// `edge_detected` is the coalesced edge flag since the previous tick.
    /// Returns `Some` exactly on the tick where `is_running` flips.
    pub fn evaluate(&mut self, now: Timestamp, edge_detected: bool) -> Option<Transition> {
        let still_vibrating = self.is_still_vibrating(now);

        if !self.state.is_running && !still_vibrating && edge_detected {
            info!("Starting up - {}", now);
            self.state = VibrationState {
                last_pulse_at: now,
                is_running: true,
            };
            return Some(Transition {
                kind: TransitionKind::Started,
                at: now,
            });
        }

        if self.state.is_running && !still_vibrating {
            info!("Stopping - {}", now);
            self.state = VibrationState {
                last_pulse_at: now,
                is_running: false,
            };
            return Some(Transition {
                kind: TransitionKind::Stopped,
                at: now,
            });
        }

        if edge_detected && now > self.state.last_pulse_at {
            self.state.last_pulse_at = now;
        }

        None
    }

    /// `true` while less than the hysteresis window has passed since the
    /// last pulse.  A `now` earlier than the last pulse counts as inside
    /// the window.
    pub fn is_still_vibrating(&self, now: Timestamp) -> bool {
        match now.checked_duration_since(self.state.last_pulse_at) {
            Some(elapsed) => elapsed < self.hysteresis,
            None => true,
        }
    }

    /// Current debounced running flag.
    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    /// Snapshot of the full state.
    pub fn state(&self) -> VibrationState {
        self.state
    }

    /// Configured debounce window.
    pub fn hysteresis(&self) -> Duration {
        self.hysteresis
    }
}
