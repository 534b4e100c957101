//! IFTTT Maker webhook notifier.
//!
//! `POST https://maker.ifttt.com/trigger/{event}/with/key/{key}` with a
//! JSON body of up to three values:
//!
//! ```text
//! {"value1":"Started"}
//! ```
//!
//! - **`target_os = "espidf"`**: HTTPS via `esp_idf_svc::http::client`, one
//!   attempt per dispatch, certificate bundle for TLS.
//! - **all other targets**: the request is built and logged, not sent.
//!
//! An empty key disables delivery; dispatch then logs and succeeds.

use core::time::Duration;

use log::{info, warn};
use serde::Serialize;

use crate::app::ports::Notifier;
use crate::config::{MonitorConfig, is_url_token};
use crate::error::NotifyError;

const MAKER_BASE_URL: &str = "https://maker.ifttt.com/trigger";

/// The Maker channel accepts at most three values.
pub const MAX_VALUES: usize = 3;

#[derive(Debug, Serialize)]
struct MakerBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    value1: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value2: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value3: Option<&'a str>,
}

/// A fully-formed trigger request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakerRequest {
    pub url: String,
    pub body: String,
}

impl MakerRequest {
    pub fn build(key: &str, event_name: &str, payload: &[&str]) -> Result<Self, NotifyError> {
        if !is_url_token(key) || !is_url_token(event_name) || payload.len() > MAX_VALUES {
            return Err(NotifyError::InvalidRequest);
        }

        let body = MakerBody {
            value1: payload.first().copied(),
            value2: payload.get(1).copied(),
            value3: payload.get(2).copied(),
        };
        let body = serde_json::to_string(&body).map_err(|_| NotifyError::InvalidRequest)?;

        Ok(Self {
            url: format!("{}/{}/with/key/{}", MAKER_BASE_URL, event_name, key),
            body,
        })
    }
}

pub struct WebhookNotifier {
    key: heapless::String<64>,
    timeout: Duration,
    sent: u64,
}

impl WebhookNotifier {
    pub fn new(key: &str, timeout: Duration) -> Self {
        let mut stored = heapless::String::new();
        if stored.push_str(key).is_err() {
            warn!("Webhook: key longer than 64 bytes, notifications disabled");
            stored.clear();
        }
        if stored.is_empty() {
            info!("Webhook: no key configured, notifications disabled");
        }
        Self {
            key: stored,
            timeout,
            sent: 0,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(&config.webhook_key, config.effect_timeout())
    }

    pub fn is_enabled(&self) -> bool {
        !self.key.is_empty()
    }

    /// Requests accepted by the remote end (or logged, on host).
    pub fn sent(&self) -> u64 {
        self.sent
    }

    #[cfg(target_os = "espidf")]
    fn send(&self, request: &MakerRequest) -> Result<(), NotifyError> {
        use esp_idf_svc::http::Method;
        use esp_idf_svc::http::client::{Configuration, EspHttpConnection};

        let config = Configuration {
            timeout: Some(self.timeout),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        };
        let mut conn = EspHttpConnection::new(&config).map_err(|_| NotifyError::ConnectFailed)?;

        let content_length = request.body.len().to_string();
        let headers = [
            ("content-type", "application/json"),
            ("content-length", content_length.as_str()),
        ];
        conn.initiate_request(Method::Post, &request.url, &headers)
            .map_err(|_| NotifyError::ConnectFailed)?;

        let mut written = 0;
        while written < request.body.len() {
            written += conn
                .write(&request.body.as_bytes()[written..])
                .map_err(|_| NotifyError::ConnectFailed)?;
        }
        conn.initiate_response()
            .map_err(|_| NotifyError::ConnectFailed)?;

        match conn.status() {
            200..=299 => Ok(()),
            status => Err(NotifyError::Rejected(status)),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn send(&self, request: &MakerRequest) -> Result<(), NotifyError> {
        info!(
            "Webhook(sim): POST {} {} (timeout {} ms)",
            request.url.replace(self.key.as_str(), "***"),
            request.body,
            self.timeout.as_millis()
        );
        Ok(())
    }
}

impl Notifier for WebhookNotifier {
    fn dispatch(&mut self, event_name: &str, payload: &[&str]) -> Result<(), NotifyError> {
        if !self.is_enabled() {
            info!("Webhook disabled, skipping {} {:?}", event_name, payload);
            return Ok(());
        }

        let request = MakerRequest::build(&self.key, event_name, payload)?;
        self.send(&request)?;
        self.sent += 1;
        Ok(())
    }
}
