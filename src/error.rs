//! Unified error types for the SpinWatch firmware.
//!
//! Each port has its own small `Copy` error enum so adapters can report
//! failures without allocation.  They all convert into the top-level
//! [`Error`]; the binary logs startup failures as [`Error`] before handing
//! them to `anyhow`.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The vibration sensor could not be configured or read.
    Sensor(SensorError),
    /// The persisted running flag could not be written or read.
    Store(StoreError),
    /// A transition notification could not be delivered.
    Notify(NotifyError),
    /// Configuration is invalid or incomplete.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Store(e) => write!(f, "store: {e}"),
            Self::Notify(e) => write!(f, "notify: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The pin number does not name a usable GPIO.
    InvalidPin(i32),
    /// Configuring the pin or its interrupt failed.
    ConfigureFailed,
    /// GPIO read returned an error.
    GpioReadFailed,
    /// Re-arming the edge interrupt failed.
    InterruptRearmFailed,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPin(pin) => write!(f, "invalid GPIO pin {pin}"),
            Self::ConfigureFailed => write!(f, "GPIO configuration failed"),
            Self::GpioReadFailed => write!(f, "GPIO read failed"),
            Self::InterruptRearmFailed => write!(f, "edge interrupt re-arm failed"),
        }
    }
}

impl std::error::Error for SensorError {}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// State store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// Nothing has been published yet.
    NotFound,
    /// The stored value is not a valid running flag.
    Corrupted,
    /// Generic I/O error from the storage backend.
    Io,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "running flag not found"),
            Self::Corrupted => write!(f, "running flag unparsable"),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

// ---------------------------------------------------------------------------
// Notification errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyError {
    /// The HTTP connection could not be established.
    ConnectFailed,
    /// The request was sent but the service answered with a non-2xx status.
    Rejected(u16),
    /// The request or payload could not be built.
    InvalidRequest,
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed => write!(f, "connection failed"),
            Self::Rejected(status) => write!(f, "rejected with HTTP {status}"),
            Self::InvalidRequest => write!(f, "invalid request"),
        }
    }
}

impl std::error::Error for NotifyError {}

impl From<NotifyError> for Error {
    fn from(e: NotifyError) -> Self {
        Self::Notify(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A required key has no value.
    Missing(&'static str),
    /// A value could not be parsed; carries the key.
    Malformed(&'static str),
    /// A value parsed but failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "{key} is required"),
            Self::Malformed(key) => write!(f, "{key} is malformed"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
