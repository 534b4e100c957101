//! PollLoop cadence and shutdown against the real uptime clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use spinwatch::adapters::edge::{EdgeLatch, LatchedEdgeSource};
use spinwatch::adapters::time::Esp32TimeAdapter;
use spinwatch::app::ports::{EdgeSource, TimePort};
use spinwatch::app::service::MonitorService;
use spinwatch::config::Edge;
use spinwatch::error::SensorError;
use spinwatch::poll_loop::PollLoop;

use super::mock_hw::{RecordingPublisher, RecordingSink};

/// Raises `stop` after `limit` reads; marks `latch` on every read first.
struct StopAfter<'a> {
    inner: LatchedEdgeSource,
    latch: &'static EdgeLatch,
    stop: &'a AtomicBool,
    reads: u32,
    limit: u32,
}

impl EdgeSource for StopAfter<'_> {
    fn poll_edge_detected(&mut self) -> Result<bool, SensorError> {
        self.latch.mark();
        self.reads += 1;
        if self.reads >= self.limit {
            self.stop.store(true, Ordering::Release);
        }
        self.inner.poll_edge_detected()
    }
}

#[test]
fn runs_until_stop_flag_with_fixed_sleep() {
    static LATCH: EdgeLatch = EdgeLatch::new();
    let stop = AtomicBool::new(false);
    let clock = Esp32TimeAdapter::new();
    let mut service = MonitorService::new(clock.now(), Duration::from_secs(60));
    let mut edges = StopAfter {
        inner: LatchedEdgeSource::configure(4, Edge::Rising, &LATCH).unwrap(),
        latch: &LATCH,
        stop: &stop,
        reads: 0,
        limit: 5,
    };
    let mut publisher = RecordingPublisher::default();
    let mut sink = RecordingSink::default();

    let interval = Duration::from_millis(10);
    let mut poll = PollLoop::new(interval, clock);
    let started = Instant::now();
    let stats = poll.run_until(&stop, &mut service, &mut edges, &mut publisher, &mut sink);

    assert_eq!(stats.ticks, 5);
    assert_eq!(stats.overruns, 0);
    assert_eq!(service.tick_count(), 5);
    // One full sleep follows every tick.
    assert!(started.elapsed() >= interval * 5);
    // Edges arrived inside the opening window, so nothing started.
    assert!(publisher.published.is_empty());
}
