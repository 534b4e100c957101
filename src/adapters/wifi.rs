//! WiFi station-mode bring-up.
//!
//! The monitor needs the network for two things only: webhook delivery and
//! the status endpoint.  Credentials are baked in at build time
//! (`WIFI_SSID` / `WIFI_PASS`) and validated before the driver is touched.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::BlockingWifi` over `EspWifi`.
//! - **all other targets**: credential handling only; there is no radio.
//!
//! ## Retry policy
//!
//! A failed association is retried after an exponential backoff (2 s →
//! 4 s → 8 s … capped at 60 s), up to [`MAX_CONNECT_ATTEMPTS`] times.

use core::fmt;
use log::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for WifiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

impl std::error::Error for WifiError {}

const INITIAL_BACKOFF_SECS: u32 = 2;
const MAX_BACKOFF_SECS: u32 = 60;
pub const MAX_CONNECT_ATTEMPTS: u32 = 8;

/// Delay before retry number `attempt` (1-based).
pub fn backoff_secs(attempt: u32) -> u32 {
    let doublings = attempt.saturating_sub(1).min(31);
    INITIAL_BACKOFF_SECS
        .saturating_mul(1u32 << doublings)
        .min(MAX_BACKOFF_SECS)
}

// ───────────────────────────────────────────────────────────────
// Credentials
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// Validated station credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
}

impl fmt::Debug for WifiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiCredentials")
            .field("ssid", &self.ssid)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl WifiCredentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, WifiError> {
        if ssid.is_empty() || !is_printable_ascii(ssid) {
            return Err(WifiError::InvalidSsid);
        }
        if !password.is_empty() && !(8..=64).contains(&password.len()) {
            return Err(WifiError::InvalidPassword);
        }

        let mut creds = Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
        };
        creds.ssid.push_str(ssid).map_err(|()| WifiError::InvalidSsid)?;
        creds
            .password
            .push_str(password)
            .map_err(|()| WifiError::InvalidPassword)?;
        Ok(creds)
    }

    /// Credentials baked in at build time.
    pub fn from_build_env() -> Result<Self, WifiError> {
        let ssid = option_env!("WIFI_SSID").unwrap_or("");
        if ssid.is_empty() {
            return Err(WifiError::NoCredentials);
        }
        Self::new(ssid, option_env!("WIFI_PASS").unwrap_or(""))
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

// ───────────────────────────────────────────────────────────────
// Station bring-up (ESP-IDF)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod station {
    use super::*;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::modem::Modem;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
    use log::warn;

    /// Start the driver in station mode and block until the netif is up.
    pub fn connect(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
        creds: &WifiCredentials,
    ) -> Result<BlockingWifi<EspWifi<'static>>, WifiError> {
        let driver = EspWifi::new(modem, sysloop.clone(), nvs).map_err(|e| {
            warn!("WiFi: driver init failed: {}", e);
            WifiError::ConnectionFailed
        })?;
        let mut wifi =
            BlockingWifi::wrap(driver, sysloop).map_err(|_| WifiError::ConnectionFailed)?;

        let config = Configuration::Client(ClientConfiguration {
            ssid: creds.ssid().try_into().map_err(|_| WifiError::InvalidSsid)?,
            password: creds
                .password
                .as_str()
                .try_into()
                .map_err(|_| WifiError::InvalidPassword)?,
            auth_method: if creds.is_open() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            ..Default::default()
        });
        wifi.set_configuration(&config)
            .map_err(|_| WifiError::ConnectionFailed)?;
        wifi.start().map_err(|_| WifiError::ConnectionFailed)?;

        for attempt in 1..=MAX_CONNECT_ATTEMPTS {
            info!("WiFi: connecting to '{}' (attempt {})", creds.ssid(), attempt);
            match wifi.connect().and_then(|()| wifi.wait_netif_up()) {
                Ok(()) => {
                    info!("WiFi: connected to '{}'", creds.ssid());
                    return Ok(wifi);
                }
                Err(e) => {
                    let delay = backoff_secs(attempt);
                    warn!("WiFi: connect failed ({}), retrying in {}s", e, delay);
                    let _ = wifi.disconnect();
                    std::thread::sleep(core::time::Duration::from_secs(u64::from(delay)));
                }
            }
        }
        Err(WifiError::ConnectionFailed)
    }
}

#[cfg(target_os = "espidf")]
pub use station::connect;

/// Host builds have no radio; log and carry on so the rest of the stack
/// can be exercised.
#[cfg(not(target_os = "espidf"))]
pub fn connect(creds: &WifiCredentials) -> Result<(), WifiError> {
    info!("WiFi(sim): pretending to join '{}'", creds.ssid());
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
