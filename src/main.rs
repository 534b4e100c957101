//! SpinWatch Firmware — Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  LatchedEdgeSource  LogEventSink  NvsAdapter    Esp32Time      │
//! │  (EdgeSource)       (EventSink)   (StateStore)  (TimePort)     │
//! │  WebhookNotifier    http_status   wifi                         │
//! │  (Notifier)         (GET /status) (STA bring-up)               │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │           MonitorService (pure logic)                  │    │
//! │  │           VibrationStateMachine                        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  PollLoop (main task) · EffectWorker (effect + notify threads) │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::gpio::{AnyInputPin, PinDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{error, info, warn};

use spinwatch::adapters::edge::{LatchedEdgeSource, SampledEdgeSource, VIBRATION_LATCH};
use spinwatch::adapters::log_sink::LogEventSink;
use spinwatch::adapters::nvs::NvsAdapter;
use spinwatch::adapters::time::Esp32TimeAdapter;
use spinwatch::adapters::webhook::WebhookNotifier;
use spinwatch::adapters::{http_status, wifi};
use spinwatch::app::effects::{self, EffectPolicy};
use spinwatch::app::ports::{EdgeSource, TimePort};
use spinwatch::app::service::MonitorService;
use spinwatch::config::{EdgeMode, MonitorConfig};
use spinwatch::error::Error;
use spinwatch::poll_loop::PollLoop;

/// Never raised on device; the loop runs until reset.
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Log a SpinWatch startup failure once, then hand it to `anyhow`.
fn fatal<E: Into<Error>>(stage: &'static str) -> impl Fn(E) -> anyhow::Error {
    move |e| {
        let e: Error = e.into();
        error!("{} failed: {}", stage, e);
        anyhow::Error::new(e)
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  SpinWatch v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration (fatal on error) ─────────────────────
    let config = MonitorConfig::from_build_env().map_err(fatal("Configuration"))?;
    match config.redacted_json() {
        Ok(json) => info!("Config: {}", json),
        Err(e) => warn!("Config not printable: {}", e),
    }

    // ── 3. Platform services ──────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    let store = Arc::new(NvsAdapter::new().map_err(fatal("NVS init"))?);

    // ── 4. Network ────────────────────────────────────────────
    let creds = wifi::WifiCredentials::from_build_env()?;
    let _wifi = wifi::connect(peripherals.modem, sysloop, Some(nvs_partition), &creds)?;
    let _server = http_status::serve(config.status_port, store.clone())?;

    // ── 5. Edge source ────────────────────────────────────────
    let mut edges: Box<dyn EdgeSource> = match config.edge_mode {
        EdgeMode::Interrupt => Box::new(
            LatchedEdgeSource::configure(config.pin, config.edge, &VIBRATION_LATCH)
                .map_err(fatal("Edge interrupt setup"))?,
        ),
        EdgeMode::Sampled => {
            // SAFETY: the pin number was range-checked by config validation and
            // is not claimed by any other driver in this firmware.
            let pin = unsafe { AnyInputPin::new(config.pin) };
            Box::new(SampledEdgeSource::new(PinDriver::input(pin)?, config.edge))
        }
    };

    // ── 6. Effect worker ──────────────────────────────────────
    if !config.notifications_enabled() {
        warn!("IFTTT_KEY not set; transitions will only be persisted");
    }
    let notifier = WebhookNotifier::from_config(&config);
    let (mut queue, worker) =
        effects::spawn(store.clone(), notifier, EffectPolicy::from_config(&config))?;

    // ── 7. Poll loop ──────────────────────────────────────────
    let clock = Esp32TimeAdapter::new();
    let mut sink = LogEventSink::new();
    let mut service = MonitorService::new(clock.now(), config.hysteresis());
    service.start(&mut sink);

    let mut poll = PollLoop::new(config.poll_interval(), clock);
    poll.run_until(&SHUTDOWN, &mut service, &mut edges, &mut queue, &mut sink);

    worker.shutdown();
    Ok(())
}
