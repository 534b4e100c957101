//! System configuration parameters
//!
//! All tunable parameters for the SpinWatch monitor.  The device has no
//! process environment, so values are baked in at build time and parsed
//! through [`MonitorConfig::from_build_env`]; any key lookup works via
//! [`MonitorConfig::from_lookup`].  Invalid configuration is fatal: the
//! monitor must not start polling with it.

use core::str::FromStr;
use core::time::Duration;

use serde::Serialize;

use crate::error::ConfigError;

/// Which signal transition counts as a vibration pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Edge {
    Rising,
    Falling,
}

impl FromStr for Edge {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rising" => Ok(Self::Rising),
            "falling" => Ok(Self::Falling),
            _ => Err(()),
        }
    }
}

/// How pulses are captured between polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EdgeMode {
    /// GPIO interrupt latches every edge (no pulse is missed).
    Interrupt,
    /// Pin level is sampled on each poll; only transitions seen across
    /// consecutive polls count.
    Sampled,
}

impl FromStr for EdgeMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interrupt" => Ok(Self::Interrupt),
            "sampled" => Ok(Self::Sampled),
            _ => Err(()),
        }
    }
}

/// Core monitor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitorConfig {
    // --- Sensor ---
    /// GPIO number the vibration sensor output is wired to
    pub pin: i32,
    /// Pulse polarity
    pub edge: Edge,
    /// Capture strategy
    pub edge_mode: EdgeMode,

    // --- Debounce ---
    /// Seconds without a pulse before a running appliance counts as stopped
    pub hysteresis_secs: u32,
    /// Poll loop cadence (milliseconds)
    pub poll_interval_ms: u32,

    // --- Notifications ---
    /// IFTTT Maker webhook key; empty disables delivery
    pub webhook_key: heapless::String<64>,
    /// IFTTT Maker event name
    pub event_name: heapless::String<64>,
    /// HTTP timeout for webhook delivery (milliseconds)
    pub effect_timeout_ms: u32,
    /// Attempts per running-flag write before giving up
    pub store_write_attempts: u8,

    // --- Status endpoint ---
    /// TCP port of the `/status` HTTP endpoint
    pub status_port: u16,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let mut event_name = heapless::String::new();
        // "appliance" always fits in 64 bytes.
        let _ = event_name.push_str("appliance");

        Self {
            // Sensor
            pin: 4,
            edge: Edge::Rising,
            edge_mode: EdgeMode::Interrupt,

            // Debounce
            hysteresis_secs: 60,
            poll_interval_ms: 5000,

            // Notifications
            webhook_key: heapless::String::new(),
            event_name,
            effect_timeout_ms: 10_000,
            store_write_attempts: 3,

            // Status endpoint
            status_port: 3000,
        }
    }
}

impl MonitorConfig {
    /// Build a config from an arbitrary key lookup, starting from defaults.
    ///
    /// `PIN` is required; every other key falls back to its default.
    /// Empty values count as unset.  The result is validated.
    pub fn from_lookup<'a>(lookup: impl Fn(&str) -> Option<&'a str>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(str::trim).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let pin = match get("PIN") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Malformed("PIN"))?,
            None => return Err(ConfigError::Missing("PIN")),
        };

        let cfg = Self {
            pin,
            edge: parse_or(get("EDGE"), "EDGE", defaults.edge)?,
            edge_mode: parse_or(get("EDGE_MODE"), "EDGE_MODE", defaults.edge_mode)?,
            hysteresis_secs: parse_or(
                get("HYSTERESIS_SECS"),
                "HYSTERESIS_SECS",
                defaults.hysteresis_secs,
            )?,
            poll_interval_ms: parse_or(
                get("POLL_INTERVAL_MS"),
                "POLL_INTERVAL_MS",
                defaults.poll_interval_ms,
            )?,
            webhook_key: match get("IFTTT_KEY") {
                Some(raw) => bounded_string(raw, "IFTTT_KEY")?,
                None => defaults.webhook_key,
            },
            event_name: match get("MAKER_EVENT_NAME") {
                Some(raw) => bounded_string(raw, "MAKER_EVENT_NAME")?,
                None => defaults.event_name,
            },
            effect_timeout_ms: parse_or(
                get("EFFECT_TIMEOUT_MS"),
                "EFFECT_TIMEOUT_MS",
                defaults.effect_timeout_ms,
            )?,
            store_write_attempts: parse_or(
                get("STORE_WRITE_ATTEMPTS"),
                "STORE_WRITE_ATTEMPTS",
                defaults.store_write_attempts,
            )?,
            status_port: parse_or(get("STATUS_PORT"), "STATUS_PORT", defaults.status_port)?,
        };

        cfg.validate()?;
        Ok(cfg)
    }

    /// Build a config from values captured at compile time.
    pub fn from_build_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| match key {
            "PIN" => option_env!("PIN"),
            "EDGE" => option_env!("EDGE"),
            "EDGE_MODE" => option_env!("EDGE_MODE"),
            "HYSTERESIS_SECS" => option_env!("HYSTERESIS_SECS"),
            "POLL_INTERVAL_MS" => option_env!("POLL_INTERVAL_MS"),
            "IFTTT_KEY" => option_env!("IFTTT_KEY"),
            "MAKER_EVENT_NAME" => option_env!("MAKER_EVENT_NAME"),
            "EFFECT_TIMEOUT_MS" => option_env!("EFFECT_TIMEOUT_MS"),
            "STORE_WRITE_ATTEMPTS" => option_env!("STORE_WRITE_ATTEMPTS"),
            "STATUS_PORT" => option_env!("STATUS_PORT"),
            _ => None,
        })
    }

    /// Range-check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=48).contains(&self.pin) {
            return Err(ConfigError::ValidationFailed("pin must be GPIO 0–48"));
        }
        if !(1..=3600).contains(&self.hysteresis_secs) {
            return Err(ConfigError::ValidationFailed(
                "hysteresis_secs must be 1–3600",
            ));
        }
        if !(100..=60_000).contains(&self.poll_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "poll_interval_ms must be 100–60000",
            ));
        }
        if u64::from(self.poll_interval_ms) >= u64::from(self.hysteresis_secs) * 1000 {
            return Err(ConfigError::ValidationFailed(
                "poll_interval_ms must be shorter than the hysteresis window",
            ));
        }
        if !self.webhook_key.is_empty() && !is_url_token(&self.webhook_key) {
            return Err(ConfigError::ValidationFailed(
                "webhook_key may only contain A-Z a-z 0-9 _ - .",
            ));
        }
        if !is_url_token(&self.event_name) {
            return Err(ConfigError::ValidationFailed(
                "event_name must be 1–64 URL-safe characters",
            ));
        }
        if !(100..=60_000).contains(&self.effect_timeout_ms) {
            return Err(ConfigError::ValidationFailed(
                "effect_timeout_ms must be 100–60000",
            ));
        }
        if !(1..=10).contains(&self.store_write_attempts) {
            return Err(ConfigError::ValidationFailed(
                "store_write_attempts must be 1–10",
            ));
        }
        if self.status_port == 0 {
            return Err(ConfigError::ValidationFailed("status_port must be non-zero"));
        }
        Ok(())
    }

    /// Debounce window as a [`Duration`].
    pub fn hysteresis(&self) -> Duration {
        Duration::from_secs(u64::from(self.hysteresis_secs))
    }

    /// Poll cadence as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.poll_interval_ms))
    }

    /// Webhook timeout as a [`Duration`].
    pub fn effect_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.effect_timeout_ms))
    }

    /// Whether webhook delivery is configured.
    pub fn notifications_enabled(&self) -> bool {
        !self.webhook_key.is_empty()
    }

    /// JSON rendering for the boot log.  A configured webhook key is masked.
    pub fn redacted_json(&self) -> Result<String, serde_json::Error> {
        let mut shown = self.clone();
        if shown.notifications_enabled() {
            shown.webhook_key.clear();
            shown.webhook_key.push_str("***").ok();
        }
        serde_json::to_string(&shown)
    }
}

fn parse_or<T: FromStr>(
    value: Option<&str>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Malformed(key)),
        None => Ok(default),
    }
}

fn bounded_string(raw: &str, key: &'static str) -> Result<heapless::String<64>, ConfigError> {
    let mut s = heapless::String::new();
    s.push_str(raw).map_err(|()| ConfigError::Malformed(key))?;
    Ok(s)
}

/// Non-empty and limited to characters that need no escaping in a URL path.
pub fn is_url_token(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'))
}
