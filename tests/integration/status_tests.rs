//! Status endpoint against the NVS adapter, fed by the effect worker.

use std::sync::Arc;
use std::time::Duration;

use spinwatch::adapters::nvs::{NvsAdapter, RUNNING_FLAG_KEY, STATE_NAMESPACE};
use spinwatch::adapters::webhook::WebhookNotifier;
use spinwatch::app::effects::{self, EffectPolicy};
use spinwatch::app::ports::{StateStore, StoragePort, TransitionPublisher};
use spinwatch::config::MonitorConfig;
use spinwatch::fsm::{Timestamp, Transition, TransitionKind};
use spinwatch::status::{self, StatusBody};

use super::mock_hw::wait_until;

#[test]
fn reports_unknown_until_first_transition() {
    let store = Arc::new(NvsAdapter::new().unwrap());
    assert_eq!(status::render(status::query(store.as_ref())).0, 503);

    let config = MonitorConfig::default();
    let (mut queue, worker) = effects::spawn(
        store.clone(),
        WebhookNotifier::from_config(&config),
        EffectPolicy::from_config(&config),
    )
    .unwrap();

    queue.publish(&Transition {
        kind: TransitionKind::Started,
        at: Timestamp::from_secs(61),
    });
    assert!(wait_until(Duration::from_secs(5), || store
        .get_running_flag()
        .is_ok()));

    assert_eq!(
        status::query(store.as_ref()),
        Ok(StatusBody { is_vibrating: true })
    );
    assert_eq!(
        status::render(status::query(store.as_ref())),
        (200, String::from(r#"{"isVibrating":true}"#))
    );
    worker.shutdown();
}

#[test]
fn corrupted_flag_is_an_error_not_false() {
    let store = NvsAdapter::new().unwrap();
    store.write(STATE_NAMESPACE, RUNNING_FLAG_KEY, b"2").unwrap();

    let (code, body) = status::render(status::query(&store));
    assert_eq!(code, 500);
    assert!(body.contains("\"error\""));
    assert!(!body.contains("isVibrating"));
}
