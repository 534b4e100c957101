//! Mock adapters for integration tests.
//!
//! Every mock records what it was asked to do so tests can assert on the
//! full history without real GPIO, flash, or network.  Store and notifier
//! share one [`Journal`] so ordering across them is observable.

use std::cell::Cell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use spinwatch::app::events::AppEvent;
use spinwatch::app::ports::{
    EdgeSource, EventSink, Notifier, StateStore, TimePort, TransitionPublisher,
};
use spinwatch::error::{NotifyError, SensorError, StoreError};
use spinwatch::fsm::{Timestamp, Transition};

// ── Shared journal ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// A store write attempt and whether it succeeded.
    StoreWrite { running: bool, ok: bool },
    /// A notification attempt.
    Notify { event: String, payload: Vec<String> },
}

#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Effect>>>);

#[allow(dead_code)]
impl Journal {
    pub fn record(&self, effect: Effect) {
        self.0.lock().unwrap().push(effect);
    }

    pub fn entries(&self) -> Vec<Effect> {
        self.0.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<(String, Vec<String>)> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                Effect::Notify { event, payload } => Some((event, payload)),
                Effect::StoreWrite { .. } => None,
            })
            .collect()
    }

    pub fn store_attempts(&self, running: bool) -> usize {
        self.entries()
            .iter()
            .filter(|e| matches!(e, Effect::StoreWrite { running: r, .. } if *r == running))
            .count()
    }

    pub fn successful_writes(&self) -> Vec<bool> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                Effect::StoreWrite { running, ok: true } => Some(running),
                _ => None,
            })
            .collect()
    }
}

/// Poll `cond` until it holds or `timeout` passes.
#[allow(dead_code)]
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    cond()
}

// ── Edge source ───────────────────────────────────────────────

/// Replays scripted readings, then reports no edge.
#[derive(Default)]
pub struct ScriptedEdges {
    script: VecDeque<Result<bool, SensorError>>,
    pub reads: u32,
}

#[allow(dead_code)]
impl ScriptedEdges {
    pub fn new(edges: &[bool]) -> Self {
        Self {
            script: edges.iter().map(|e| Ok(*e)).collect(),
            reads: 0,
        }
    }

    pub fn push(&mut self, reading: Result<bool, SensorError>) {
        self.script.push_back(reading);
    }
}

impl EdgeSource for ScriptedEdges {
    fn poll_edge_detected(&mut self) -> Result<bool, SensorError> {
        self.reads += 1;
        self.script.pop_front().unwrap_or(Ok(false))
    }
}

// ── State store ───────────────────────────────────────────────

/// In-memory store that can be told to fail its next N writes.
pub struct RecordingStore {
    journal: Journal,
    value: Mutex<Option<bool>>,
    failures_left: AtomicU32,
}

#[allow(dead_code)]
impl RecordingStore {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            value: Mutex::new(None),
            failures_left: AtomicU32::new(0),
        }
    }

    pub fn failing(journal: Journal, failures: u32) -> Self {
        let store = Self::new(journal);
        store.failures_left.store(failures, Ordering::SeqCst);
        store
    }
}

impl StateStore for RecordingStore {
    fn set_running_flag(&self, running: bool) -> Result<(), StoreError> {
        let fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        self.journal.record(Effect::StoreWrite { running, ok: !fail });
        if fail {
            return Err(StoreError::Io);
        }
        *self.value.lock().unwrap() = Some(running);
        Ok(())
    }

    fn get_running_flag(&self) -> Result<bool, StoreError> {
        self.value.lock().unwrap().ok_or(StoreError::NotFound)
    }
}

// ── Notifier ──────────────────────────────────────────────────

/// Records every dispatch; optionally fails or blocks behind a gate.
pub struct RecordingNotifier {
    journal: Journal,
    fail_with: Option<NotifyError>,
    gate: Option<Gate>,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            fail_with: None,
            gate: None,
        }
    }

    pub fn failing(journal: Journal, error: NotifyError) -> Self {
        Self {
            fail_with: Some(error),
            ..Self::new(journal)
        }
    }

    pub fn gated(journal: Journal, gate: Gate) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(journal)
        }
    }
}

impl Notifier for RecordingNotifier {
    fn dispatch(&mut self, event_name: &str, payload: &[&str]) -> Result<(), NotifyError> {
        if let Some(gate) = &self.gate {
            gate.pass();
        }
        self.journal.record(Effect::Notify {
            event: event_name.to_owned(),
            payload: payload.iter().map(|s| (*s).to_owned()).collect(),
        });
        match self.fail_with {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Blocks callers of [`Gate::pass`] until opened; counts arrivals.
#[derive(Clone, Default)]
pub struct Gate(Arc<(Mutex<GateState>, Condvar)>);

#[derive(Default)]
pub struct GateState {
    open: bool,
    arrivals: u32,
}

#[allow(dead_code)]
impl Gate {
    pub fn pass(&self) {
        let (lock, cvar) = &*self.0;
        let mut state = lock.lock().unwrap();
        state.arrivals += 1;
        while !state.open {
            state = cvar.wait(state).unwrap();
        }
    }

    pub fn open(&self) {
        let (lock, cvar) = &*self.0;
        lock.lock().unwrap().open = true;
        cvar.notify_all();
    }

    pub fn arrivals(&self) -> u32 {
        self.0.0.lock().unwrap().arrivals
    }
}

// ── Publisher / sink / clock ──────────────────────────────────

#[derive(Default)]
pub struct RecordingPublisher {
    pub published: Vec<Transition>,
}

impl TransitionPublisher for RecordingPublisher {
    fn publish(&mut self, transition: &Transition) {
        self.published.push(*transition);
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

/// Clock that only moves when told to.
#[derive(Default)]
pub struct ManualClock {
    now_ms: Cell<u64>,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn at_secs(secs: u64) -> Self {
        let clock = Self::default();
        clock.set_secs(secs);
        clock
    }

    pub fn set_secs(&self, secs: u64) {
        self.now_ms.set(secs * 1000);
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms.set(self.now_ms.get() + by.as_millis() as u64);
    }
}

impl TimePort for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.now_ms.get())
    }
}
