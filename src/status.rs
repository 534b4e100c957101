//! Status query — the read side of the published running flag.
//!
//! Reads the [`StateStore`] directly, never the poll loop's in-memory
//! state.  A missing or unreadable value is reported as an explicit error;
//! the endpoint never answers `false` in its place.

use core::fmt;

use serde::Serialize;

use crate::app::ports::StateStore;
use crate::error::StoreError;

/// `200 OK` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusBody {
    #[serde(rename = "isVibrating")]
    pub is_vibrating: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusError {
    /// Nothing has been published yet.
    Unknown,
    /// The stored value is neither `0` nor `1`.
    Unreadable,
    /// The store itself failed.
    Backend,
}

impl StatusError {
    pub const fn http_status(self) -> u16 {
        match self {
            Self::Unknown => 503,
            Self::Unreadable | Self::Backend => 500,
        }
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "state not yet published"),
            Self::Unreadable => write!(f, "stored state is unreadable"),
            Self::Backend => write!(f, "state store unavailable"),
        }
    }
}

impl std::error::Error for StatusError {}

impl From<StoreError> for StatusError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => Self::Unknown,
            StoreError::Corrupted => Self::Unreadable,
            StoreError::Io => Self::Backend,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// Read the last published flag.
pub fn query<S: StateStore + ?Sized>(store: &S) -> Result<StatusBody, StatusError> {
    let is_vibrating = store.get_running_flag()?;
    Ok(StatusBody { is_vibrating })
}

/// Map a query result to `(http_status, json_body)`.
pub fn render(result: Result<StatusBody, StatusError>) -> (u16, String) {
    let (status, body) = match result {
        Ok(body) => (200, serde_json::to_string(&body)),
        Err(e) => {
            let message = e.to_string();
            (
                e.http_status(),
                serde_json::to_string(&ErrorBody { error: &message }),
            )
        }
    };
    match body {
        Ok(json) => (status, json),
        Err(_) => (500, String::from(r#"{"error":"serialisation failed"}"#)),
    }
}
