//! Effect worker: ordering, retry, supersession, back-pressure, and
//! isolation of the webhook from store writes.

use std::sync::Arc;
use std::time::Duration;

use spinwatch::app::effects::{self, EFFECT_QUEUE_DEPTH, EffectPolicy};
use spinwatch::app::ports::{StateStore, TransitionPublisher};
use spinwatch::config::MonitorConfig;
use spinwatch::error::{NotifyError, StoreError};
use spinwatch::fsm::{Timestamp, Transition, TransitionKind};

use super::mock_hw::{Effect, Gate, Journal, RecordingNotifier, RecordingStore, wait_until};

const WAIT: Duration = Duration::from_secs(5);

fn policy(attempts: u8, backoff_ms: u64) -> EffectPolicy {
    EffectPolicy {
        store_write_attempts: attempts,
        retry_backoff: Duration::from_millis(backoff_ms),
        ..EffectPolicy::from_config(&MonitorConfig::default())
    }
}

fn started(secs: u64) -> Transition {
    Transition {
        kind: TransitionKind::Started,
        at: Timestamp::from_secs(secs),
    }
}

fn stopped(secs: u64) -> Transition {
    Transition {
        kind: TransitionKind::Stopped,
        at: Timestamp::from_secs(secs),
    }
}

#[test]
fn store_write_precedes_notification() {
    let journal = Journal::default();
    let store = Arc::new(RecordingStore::new(journal.clone()));
    let notifier = RecordingNotifier::new(journal.clone());
    let (mut queue, worker) = effects::spawn(store.clone(), notifier, policy(3, 1)).unwrap();

    queue.publish(&started(61));
    assert!(wait_until(WAIT, || journal.notifications().len() == 1));

    assert_eq!(
        journal.entries(),
        vec![
            Effect::StoreWrite {
                running: true,
                ok: true
            },
            Effect::Notify {
                event: "appliance".into(),
                payload: vec!["Started".into()]
            },
        ]
    );
    assert_eq!(store.get_running_flag(), Ok(true));
    assert_eq!(queue.published(), 1);
    worker.shutdown();
}

#[test]
fn failed_store_write_is_retried() {
    let journal = Journal::default();
    let store = Arc::new(RecordingStore::failing(journal.clone(), 2));
    let notifier = RecordingNotifier::new(journal.clone());
    let (mut queue, worker) = effects::spawn(store.clone(), notifier, policy(3, 1)).unwrap();

    queue.publish(&started(61));
    assert!(wait_until(WAIT, || journal.notifications().len() == 1));

    assert_eq!(journal.store_attempts(true), 3);
    assert_eq!(journal.successful_writes(), vec![true]);
    assert_eq!(store.get_running_flag(), Ok(true));
    worker.shutdown();
}

#[test]
fn exhausted_store_retries_still_notify() {
    let journal = Journal::default();
    let store = Arc::new(RecordingStore::failing(journal.clone(), u32::MAX));
    let notifier = RecordingNotifier::new(journal.clone());
    let (mut queue, worker) = effects::spawn(store.clone(), notifier, policy(3, 1)).unwrap();

    queue.publish(&started(61));
    assert!(wait_until(WAIT, || journal.notifications().len() == 1));

    assert_eq!(journal.store_attempts(true), 3);
    assert!(journal.successful_writes().is_empty());
    assert_eq!(store.get_running_flag(), Err(StoreError::NotFound));
    worker.shutdown();
}

#[test]
fn failed_notification_is_not_retried() {
    let journal = Journal::default();
    let store = Arc::new(RecordingStore::new(journal.clone()));
    let notifier = RecordingNotifier::failing(journal.clone(), NotifyError::Rejected(500));
    let (mut queue, worker) = effects::spawn(store, notifier, policy(3, 1)).unwrap();

    queue.publish(&started(61));
    assert!(wait_until(WAIT, || journal.notifications().len() == 1));
    std::thread::sleep(Duration::from_millis(50));

    assert_eq!(journal.notifications().len(), 1);
    worker.shutdown();
}

#[test]
fn newer_transition_supersedes_store_retry() {
    let journal = Journal::default();
    let store = Arc::new(RecordingStore::failing(journal.clone(), u32::MAX));
    let notifier = RecordingNotifier::new(journal.clone());
    let (mut queue, worker) = effects::spawn(store, notifier, policy(4, 20)).unwrap();

    queue.publish(&started(61));
    queue.publish(&stopped(130));
    assert!(wait_until(WAIT, || journal.notifications().len() == 2));

    // The older job gave up after its first backoff; the newer one ran to
    // exhaustion.
    assert_eq!(journal.store_attempts(true), 1);
    assert_eq!(journal.store_attempts(false), 4);

    let mut messages: Vec<_> = journal
        .notifications()
        .into_iter()
        .map(|(_, payload)| payload[0].clone())
        .collect();
    messages.sort();
    assert_eq!(messages, vec!["Started", "Stopped"]);
    worker.shutdown();
}

#[test]
fn slow_webhook_does_not_hold_back_next_store_write() {
    let journal = Journal::default();
    let gate = Gate::default();
    let store = Arc::new(RecordingStore::new(journal.clone()));
    let notifier = RecordingNotifier::gated(journal.clone(), gate.clone());
    let (mut queue, worker) = effects::spawn(store.clone(), notifier, policy(3, 1)).unwrap();

    // First job's webhook is stuck on the wire.
    queue.publish(&started(61));
    assert!(wait_until(WAIT, || gate.arrivals() == 1));

    queue.publish(&stopped(130));
    assert!(wait_until(WAIT, || journal.successful_writes() == vec![true, false]));
    assert_eq!(store.get_running_flag(), Ok(false));
    assert!(journal.notifications().is_empty());

    gate.open();
    assert!(wait_until(WAIT, || journal.notifications().len() == 2));
    let messages: Vec<_> = journal
        .notifications()
        .into_iter()
        .map(|(_, payload)| payload[0].clone())
        .collect();
    assert_eq!(messages, vec!["Started", "Stopped"]);
    worker.shutdown();
}

#[test]
fn backed_up_notifier_drops_instead_of_blocking() {
    let journal = Journal::default();
    let gate = Gate::default();
    let store = Arc::new(RecordingStore::new(journal.clone()));
    let notifier = RecordingNotifier::gated(journal.clone(), gate.clone());
    let (mut queue, worker) = effects::spawn(store, notifier, policy(1, 1)).unwrap();

    // First job parks the notify thread inside the webhook.
    queue.publish(&started(61));
    assert!(wait_until(WAIT, || gate.arrivals() == 1));

    let extra = 2;
    for i in 0..(EFFECT_QUEUE_DEPTH + extra) {
        let at = 200 + i as u64 * 100;
        if i % 2 == 0 {
            queue.publish(&stopped(at));
        } else {
            queue.publish(&started(at));
        }
    }

    // Losses land on whichever bounded channel filled first, but the
    // publisher itself never blocks and the total is exact.
    assert!(wait_until(WAIT, || {
        queue.dropped() + queue.notifications_dropped() == extra as u64
    }));
    let accepted = 1 + EFFECT_QUEUE_DEPTH + extra - queue.dropped() as usize;
    assert!(wait_until(WAIT, || journal.successful_writes().len() == accepted));

    gate.open();
    assert!(wait_until(WAIT, || {
        journal.notifications().len() == 1 + EFFECT_QUEUE_DEPTH
    }));
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(journal.notifications().len(), 1 + EFFECT_QUEUE_DEPTH);
    worker.shutdown();
}

#[test]
fn shutdown_abandons_pending_work() {
    let journal = Journal::default();
    let store = Arc::new(RecordingStore::failing(journal.clone(), u32::MAX));
    let notifier = RecordingNotifier::new(journal.clone());
    let (mut queue, worker) = effects::spawn(store, notifier, policy(10, 1_000)).unwrap();

    queue.publish(&started(61));
    assert!(wait_until(WAIT, || journal.store_attempts(true) == 1));

    // Returns promptly even though the job is mid-backoff.
    worker.shutdown();
    assert!(journal.notifications().is_empty());

    // Publishing after shutdown is harmless.
    queue.publish(&stopped(200));
}
