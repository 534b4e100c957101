//! Fixed-cadence poll loop.
//!
//! Drives [`MonitorService::tick`] once per interval on the calling thread.
//! The loop sleeps one full interval after every tick; there is no drift
//! correction, so the effective period is `interval + tick work`.
//!
//! ```text
//!  ┌─────────┐   now    ┌────────────────┐  transition  ┌────────────┐
//!  │ TimePort│─────────▶│ MonitorService │─────────────▶│ EffectQueue│
//!  └─────────┘          └────────────────┘              └────────────┘
//!        ▲                                                    │
//!        └──────────── sleep(interval) ◀──────────────────────┘
//! ```

use core::time::Duration;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};

use crate::app::ports::{EdgeSource, EventSink, TimePort, TransitionPublisher};
use crate::app::service::MonitorService;
use crate::fsm::Transition;

/// Loop health counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Ticks executed.
    pub ticks: u64,
    /// Ticks whose work took longer than one interval.
    pub overruns: u64,
    /// Longest observed tick work.
    pub worst_case: Duration,
}

pub struct PollLoop<C: TimePort> {
    interval: Duration,
    clock: C,
    stats: LoopStats,
}

impl<C: TimePort> PollLoop<C> {
    pub fn new(interval: Duration, clock: C) -> Self {
        Self {
            interval,
            clock,
            stats: LoopStats::default(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Execute a single tick stamped with the current clock reading.
    pub fn tick<E, P, S>(
        &mut self,
        service: &mut MonitorService,
        edges: &mut E,
        publisher: &mut P,
        sink: &mut S,
    ) -> Option<Transition>
    where
        E: EdgeSource + ?Sized,
        P: TransitionPublisher + ?Sized,
        S: EventSink + ?Sized,
    {
        let started = self.clock.now();
        let transition = service.tick(started, edges, publisher, sink);
        let elapsed = self
            .clock
            .now()
            .checked_duration_since(started)
            .unwrap_or_default();

        self.stats.ticks += 1;
        if elapsed > self.stats.worst_case {
            self.stats.worst_case = elapsed;
        }
        if elapsed > self.interval {
            self.stats.overruns += 1;
            warn!(
                "Tick {} overran: {} ms > {} ms",
                self.stats.ticks,
                elapsed.as_millis(),
                self.interval.as_millis()
            );
        }

        transition
    }

    /// Tick, then sleep one interval, until `stop` is raised.
    ///
    /// `stop` is checked before each tick and after each sleep.
    pub fn run_until<E, P, S>(
        &mut self,
        stop: &AtomicBool,
        service: &mut MonitorService,
        edges: &mut E,
        publisher: &mut P,
        sink: &mut S,
    ) -> LoopStats
    where
        E: EdgeSource + ?Sized,
        P: TransitionPublisher + ?Sized,
        S: EventSink + ?Sized,
    {
        info!("Poll loop running every {} ms", self.interval.as_millis());

        while !stop.load(Ordering::Acquire) {
            self.tick(service, edges, publisher, sink);
            std::thread::sleep(self.interval);
        }

        info!(
            "Poll loop stopped after {} ticks ({} overruns, worst {} ms)",
            self.stats.ticks,
            self.stats.overruns,
            self.stats.worst_case.as_millis()
        );
        self.stats
    }
}
