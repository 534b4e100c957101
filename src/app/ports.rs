//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ MonitorService (domain)
//! ```
//!
//! Driven adapters (edge source, state store, notifier, event sinks, clock)
//! implement these traits.  The [`MonitorService`](super::service::MonitorService)
//! and the [effect worker](super::effects) consume them via generics, so the
//! domain core never touches hardware or the network directly.
//!
//! All port errors are typed; callers handle every variant explicitly.

use crate::error::{NotifyError, SensorError, StoreError};
use crate::fsm::{Timestamp, Transition};

// ───────────────────────────────────────────────────────────────
// Edge source (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port for the vibration input.
///
/// Polled, not pushed.  Implementations must not block.
pub trait EdgeSource {
    /// Whether at least one pulse edge occurred since the previous call.
    /// Reading clears the coalesced flag.
    fn poll_edge_detected(&mut self) -> Result<bool, SensorError>;
}

impl<T: EdgeSource + ?Sized> EdgeSource for Box<T> {
    fn poll_edge_detected(&mut self) -> Result<bool, SensorError> {
        (**self).poll_edge_detected()
    }
}

// ───────────────────────────────────────────────────────────────
// State store (driven adapter: domain ↔ persistent flag)
// ───────────────────────────────────────────────────────────────

/// Persistent home of the published running flag.
///
/// Shared between the effect worker (writer) and the status endpoint
/// (reader), hence `&self` methods; implementations synchronise internally.
pub trait StateStore {
    /// Publish the debounced running flag.
    fn set_running_flag(&self, running: bool) -> Result<(), StoreError>;

    /// Read back the last published flag.
    ///
    /// Returns [`StoreError::NotFound`] before the first publish and
    /// [`StoreError::Corrupted`] for an unparsable value, never a default.
    fn get_running_flag(&self) -> Result<bool, StoreError>;
}

impl<T: StateStore + ?Sized> StateStore for std::sync::Arc<T> {
    fn set_running_flag(&self, running: bool) -> Result<(), StoreError> {
        (**self).set_running_flag(running)
    }

    fn get_running_flag(&self) -> Result<bool, StoreError> {
        (**self).get_running_flag()
    }
}

// ───────────────────────────────────────────────────────────────
// Notifier (driven adapter: domain → webhook)
// ───────────────────────────────────────────────────────────────

/// Outbound notification channel.
pub trait Notifier {
    /// Deliver `payload` under `event_name`.  Called at most once per
    /// transition; implementations must not retry internally.
    fn dispatch(&mut self, event_name: &str, payload: &[&str]) -> Result<(), NotifyError>;
}

// ───────────────────────────────────────────────────────────────
// Transition publisher (domain → side effects)
// ───────────────────────────────────────────────────────────────

/// Receives every confirmed transition exactly once.
///
/// The production implementation is [`EffectQueue`](super::effects::EffectQueue),
/// which hands the transition to the effect worker without blocking.
pub trait TransitionPublisher {
    fn publish(&mut self, transition: &Transition);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Monotonic clock used to stamp poll ticks.
pub trait TimePort {
    fn now(&self) -> Timestamp;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage.
///
/// - Keys are namespaced to prevent collisions between subsystems.
/// - Write operations MUST be atomic: no partial writes on power loss.
///   The ESP-IDF NVS API guarantees this natively; in-memory simulation
///   achieves it trivially.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl From<StorageError> for StoreError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => Self::NotFound,
            StorageError::Full | StorageError::IoError => Self::Io,
        }
    }
}

impl From<StorageError> for crate::error::Error {
    fn from(e: StorageError) -> Self {
        Self::Store(e.into())
    }
}
