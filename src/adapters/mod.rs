//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                 |
//! |----------------|--------------------|-----------------------------|
//! | `edge`         | EdgeSource         | GPIO ISR latch / level read |
//! | `http_status`  | —                  | ESP-IDF HTTP server         |
//! | `log_sink`     | EventSink          | Serial log output           |
//! | `nvs`          | StoragePort        | NVS / in-memory store       |
//! |                | StateStore         |                             |
//! | `time`         | TimePort           | ESP32 system timer          |
//! | `webhook`      | Notifier           | IFTTT Maker over HTTPS      |
//! | `wifi`         | —                  | ESP-IDF WiFi STA            |

pub mod edge;
#[cfg(target_os = "espidf")]
pub mod http_status;
pub mod log_sink;
pub mod nvs;
pub mod time;
pub mod webhook;
pub mod wifi;
