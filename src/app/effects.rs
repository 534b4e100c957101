//! Transition side effects — off-loop, reactor-driven worker.
//!
//! The poll loop must never wait on flash or the network, so every
//! confirmed transition is handed to a dedicated thread through a bounded
//! `embassy-sync` channel.  The thread runs an `edge-executor`
//! [`LocalExecutor`](edge_executor::LocalExecutor); each job becomes its
//! own detached task that persists the running flag.  Once a job's store
//! write is settled it moves to the notify lane, a second thread that owns
//! the blocking webhook client.  A slow webhook therefore holds back later
//! notifications only, never a store write.
//!
//! ```text
//!  ┌────────────┐  try_send   ┌──────────────────────────────┐
//!  │ Poll loop  │────────────▶│  Effect thread               │
//!  │ EffectQueue│  EffectJob  │  LocalExecutor               │
//!  └────────────┘             │   receive ─▶ spawn(job task) │
//!                             │   job: store write (retry)   │
//!                             └──────────────┬───────────────┘
//!                                            │ try_send (settled job)
//!                             ┌──────────────▼───────────────┐
//!                             │  Notify thread               │
//!                             │   dispatch (once, blocking)  │
//!                             └──────────────────────────────┘
//! ```
//!
//! Store writes are idempotent and are retried with backoff, but a retry
//! is abandoned as soon as a newer job has been queued.  Notifications
//! are sent at most once and never retried; when the notify lane is full
//! the notification is dropped and counted.

use core::time::Duration;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;

use edge_executor::LocalExecutor;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use log::{info, warn};

use crate::config::MonitorConfig;
use crate::fsm::Transition;

use super::ports::{Notifier, StateStore, TransitionPublisher};

/// Jobs that may wait in either channel before new ones are dropped.
pub const EFFECT_QUEUE_DEPTH: usize = 8;

/// Scheduled-task capacity of the worker executor.
const EXECUTOR_TASKS: usize = 16;

const WORKER_STACK_SIZE: usize = 8 * 1024;

/// The TLS handshake inside the webhook client needs room.
const NOTIFIER_STACK_SIZE: usize = 16 * 1024;

type EffectChannel = Channel<CriticalSectionRawMutex, EffectJob, EFFECT_QUEUE_DEPTH>;
type ShutdownSignal = Signal<CriticalSectionRawMutex, ()>;
type WorkerExecutor = LocalExecutor<'static, EXECUTOR_TASKS>;

// ── Jobs and policy ──────────────────────────────────────────

/// One transition awaiting its side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectJob {
    /// Monotonic publish sequence, starting at 1.
    pub seq: u64,
    pub transition: Transition,
}

/// How the worker applies a job.
#[derive(Debug, Clone)]
pub struct EffectPolicy {
    /// Webhook event name passed to the notifier.
    pub event_name: heapless::String<64>,
    /// Attempts per store write (at least one is always made).
    pub store_write_attempts: u8,
    /// Base backoff between store attempts; grows linearly per attempt.
    pub retry_backoff: Duration,
}

impl EffectPolicy {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            event_name: config.event_name.clone(),
            store_write_attempts: config.store_write_attempts,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

/// `true` once a job newer than `seq` has been queued.
pub fn is_superseded(seq: u64, latest: u64) -> bool {
    latest > seq
}

// ── Producer half (poll loop side) ───────────────────────────

/// Non-blocking [`TransitionPublisher`] feeding the effect worker.
pub struct EffectQueue {
    channel: Arc<EffectChannel>,
    latest: Arc<AtomicU64>,
    next_seq: u64,
    dropped: u64,
    notify_dropped: Arc<AtomicU64>,
}

impl EffectQueue {
    /// Jobs queued successfully since startup.
    pub fn published(&self) -> u64 {
        self.latest.load(Ordering::Acquire)
    }

    /// Jobs lost because the effect channel was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Notifications lost because the notify lane was full.
    pub fn notifications_dropped(&self) -> u64 {
        self.notify_dropped.load(Ordering::Acquire)
    }
}

impl TransitionPublisher for EffectQueue {
    fn publish(&mut self, transition: &Transition) {
        let job = EffectJob {
            seq: self.next_seq + 1,
            transition: *transition,
        };
        if self.channel.try_send(job).is_err() {
            self.dropped += 1;
            warn!(
                "Effect queue full, dropping {} at {}",
                transition.kind.message(),
                transition.at
            );
            return;
        }
        self.next_seq = job.seq;
        self.latest.store(job.seq, Ordering::Release);
    }
}

// ── Worker handle ────────────────────────────────────────────

struct Lane {
    shutdown: Arc<ShutdownSignal>,
    handle: Option<JoinHandle<()>>,
}

impl Lane {
    fn spawn(
        name: &str,
        stack_size: usize,
        body: impl FnOnce(&ShutdownSignal) + Send + 'static,
    ) -> std::io::Result<Self> {
        let shutdown = Arc::new(ShutdownSignal::new());
        let handle = {
            let shutdown = shutdown.clone();
            std::thread::Builder::new()
                .name(name.into())
                .stack_size(stack_size)
                .spawn(move || body(&shutdown))?
        };
        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }

    fn signal(&self) {
        self.shutdown.signal(());
    }

    fn join(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if handle.join().is_err() {
            warn!("Effect lane panicked");
        }
    }
}

/// Owns the effect and notify threads.  Dropping it stops both.
pub struct EffectWorker {
    effects: Lane,
    notify: Lane,
}

impl EffectWorker {
    /// Stop both threads and join them.  Jobs still queued or in flight
    /// are abandoned; a webhook already on the wire is allowed to finish.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.effects.signal();
        self.notify.signal();
        self.effects.join();
        self.notify.join();
    }
}

impl Drop for EffectWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawn the effect and notify threads and return the producer half.
///
/// `store` and `notifier` move into their threads; share the store with
/// the status endpoint through an `Arc`.
pub fn spawn<S, N>(
    store: S,
    notifier: N,
    policy: EffectPolicy,
) -> std::io::Result<(EffectQueue, EffectWorker)>
where
    S: StateStore + Send + 'static,
    N: Notifier + Send + 'static,
{
    let channel = Arc::new(EffectChannel::new());
    let lane = Arc::new(EffectChannel::new());
    let latest = Arc::new(AtomicU64::new(0));
    let notify_dropped = Arc::new(AtomicU64::new(0));

    let notify = {
        let lane = lane.clone();
        let event_name = policy.event_name.clone();
        Lane::spawn("notify", NOTIFIER_STACK_SIZE, move |shutdown| {
            run_notifier(&lane, shutdown, notifier, &event_name);
        })?
    };

    let effects = {
        let channel = channel.clone();
        let ctx = EffectContext {
            store,
            policy,
            latest: latest.clone(),
            lane,
            notify_dropped: notify_dropped.clone(),
        };
        Lane::spawn("effects", WORKER_STACK_SIZE, move |shutdown| {
            run_worker(&channel, shutdown, ctx);
        })
    };
    // Without the effect thread nothing reaches the notifier; stop it.
    let effects = match effects {
        Ok(effects) => effects,
        Err(e) => {
            let mut notify = notify;
            notify.signal();
            notify.join();
            return Err(e);
        }
    };

    let queue = EffectQueue {
        channel,
        latest,
        next_seq: 0,
        dropped: 0,
        notify_dropped,
    };
    Ok((queue, EffectWorker { effects, notify }))
}

// ── Effect thread ────────────────────────────────────────────

struct EffectContext<S> {
    store: S,
    policy: EffectPolicy,
    latest: Arc<AtomicU64>,
    lane: Arc<EffectChannel>,
    notify_dropped: Arc<AtomicU64>,
}

fn run_worker<S>(channel: &EffectChannel, shutdown: &ShutdownSignal, ctx: EffectContext<S>)
where
    S: StateStore + 'static,
{
    let executor: Rc<WorkerExecutor> = Rc::new(LocalExecutor::new());
    let ctx = Rc::new(ctx);

    info!("Effect worker started (queue depth {})", EFFECT_QUEUE_DEPTH);

    futures_lite::future::block_on(executor.run(futures_lite::future::or(
        receive_jobs(executor.clone(), channel, ctx),
        shutdown.wait(),
    )));

    info!("Effect worker stopped");
}

/// Receive loop. Spawns one task per job; jobs never wait on each other.
async fn receive_jobs<S>(
    executor: Rc<WorkerExecutor>,
    channel: &EffectChannel,
    ctx: Rc<EffectContext<S>>,
) where
    S: StateStore + 'static,
{
    loop {
        let job = channel.receive().await;
        executor.spawn(apply_effects(job, ctx.clone())).detach();
    }
}

/// Persist, then hand the job to the notify lane.  Both are always
/// attempted.
async fn apply_effects<S>(job: EffectJob, ctx: Rc<EffectContext<S>>)
where
    S: StateStore,
{
    persist(&job, &ctx).await;

    if ctx.lane.try_send(job).is_err() {
        ctx.notify_dropped.fetch_add(1, Ordering::AcqRel);
        warn!(
            "Notify lane full, dropping {} #{}",
            job.transition.kind.message(),
            job.seq
        );
    }
}

async fn persist<S>(job: &EffectJob, ctx: &EffectContext<S>)
where
    S: StateStore,
{
    let running = job.transition.kind.is_running();
    let attempts = ctx.policy.store_write_attempts.max(1);

    for attempt in 1..=attempts {
        match ctx.store.set_running_flag(running) {
            Ok(()) => return,
            Err(e) => warn!(
                "Store write #{} ({}) attempt {}/{} failed: {}",
                job.seq, running, attempt, attempts, e
            ),
        }
        if attempt == attempts {
            break;
        }

        async_io_mini::Timer::after(ctx.policy.retry_backoff * u32::from(attempt)).await;

        if is_superseded(job.seq, ctx.latest.load(Ordering::Acquire)) {
            info!("Store write #{} superseded by a newer transition", job.seq);
            return;
        }
    }

    warn!("Store write #{} abandoned; next transition will correct it", job.seq);
}

// ── Notify thread ────────────────────────────────────────────

fn run_notifier<N: Notifier>(
    lane: &EffectChannel,
    shutdown: &ShutdownSignal,
    mut notifier: N,
    event_name: &str,
) {
    futures_lite::future::block_on(futures_lite::future::or(
        deliver_notifications(lane, shutdown, &mut notifier, event_name),
        shutdown.wait(),
    ));
    info!("Notifier stopped");
}

async fn deliver_notifications<N: Notifier>(
    lane: &EffectChannel,
    shutdown: &ShutdownSignal,
    notifier: &mut N,
    event_name: &str,
) {
    loop {
        let job = lane.receive().await;
        // Queued notifications are abandoned once shutdown is requested.
        if shutdown.signaled() {
            return;
        }
        let message = job.transition.kind.message();
        info!("Sending message - {} - {}", event_name, message);
        if let Err(e) = notifier.dispatch(event_name, &[message]) {
            warn!("Notification {} #{} failed: {}", message, job.seq, e);
        }
    }
}
