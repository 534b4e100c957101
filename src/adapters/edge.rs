//! Vibration input adapters.
//!
//! Two ways to feed [`EdgeSource`]:
//!
//! | Mode        | Adapter                | How edges are seen                    |
//! |-------------|------------------------|---------------------------------------|
//! | `interrupt` | [`LatchedEdgeSource`]  | GPIO ISR sets an [`EdgeLatch`]        |
//! | `sampled`   | [`SampledEdgeSource`]  | level compared between poll ticks     |
//!
//! Both coalesce: any number of pulses between two polls reads as one
//! `true`, and reading clears the flag.

use core::sync::atomic::{AtomicBool, Ordering};

use embedded_hal::digital::InputPin;
use log::{info, warn};

use crate::app::ports::EdgeSource;
use crate::config::Edge;
use crate::error::SensorError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Highest GPIO number on the ESP32 family (ESP32-S3 has 0..=48).
pub const MAX_GPIO: i32 = 48;

/// Latch written by the vibration ISR and swapped by the poll loop.
pub static VIBRATION_LATCH: EdgeLatch = EdgeLatch::new();

// ── Latch ───────────────────────────────────────────────────────

/// One-bit "an edge happened" flag, safe to set from interrupt context.
#[derive(Debug)]
pub struct EdgeLatch {
    pending: AtomicBool,
}

impl EdgeLatch {
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
        }
    }

    /// Record an edge.  ISR-safe.
    pub fn mark(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Return and clear the pending flag.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }
}

impl Default for EdgeLatch {
    fn default() -> Self {
        Self::new()
    }
}

fn check_pin(pin: i32) -> Result<(), SensorError> {
    if (0..=MAX_GPIO).contains(&pin) {
        Ok(())
    } else {
        Err(SensorError::InvalidPin(pin))
    }
}

// ── Interrupt mode ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn vibration_gpio_isr(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` is the address of a `'static EdgeLatch` registered in
    // `LatchedEdgeSource::configure`; `mark` is a single atomic store.
    let latch = unsafe { &*(arg as *const EdgeLatch) };
    latch.mark();
}

/// Register the handler, then enable the interrupt.  A failed enable
/// detaches the handler again so no ISR is left behind.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
fn attach_isr(
    add: impl FnOnce() -> bool,
    enable: impl FnOnce() -> bool,
    remove: impl FnOnce(),
) -> Result<(), SensorError> {
    if !add() {
        return Err(SensorError::ConfigureFailed);
    }
    if !enable() {
        remove();
        return Err(SensorError::InterruptRearmFailed);
    }
    Ok(())
}

/// Interrupt-driven edge source.
pub struct LatchedEdgeSource {
    pin: i32,
    edge: Edge,
    latch: &'static EdgeLatch,
}

impl LatchedEdgeSource {
    /// Configure `pin` as an input and attach an ISR for `edge`.
    #[cfg(target_os = "espidf")]
    pub fn configure(pin: i32, edge: Edge, latch: &'static EdgeLatch) -> Result<Self, SensorError> {
        check_pin(pin)?;

        let intr_type = match edge {
            Edge::Rising => gpio_int_type_t_GPIO_INTR_POSEDGE,
            Edge::Falling => gpio_int_type_t_GPIO_INTR_NEGEDGE,
        };
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type,
        };
        // SAFETY: plain driver calls on a validated pin, made once at boot.
        // The ISR argument points at a `'static` latch.
        unsafe {
            if gpio_config(&cfg) != ESP_OK {
                return Err(SensorError::ConfigureFailed);
            }
            let ret = gpio_install_isr_service(0);
            if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
                return Err(SensorError::ConfigureFailed);
            }
        }
        let arg = latch as *const EdgeLatch as *mut core::ffi::c_void;
        attach_isr(
            // SAFETY: `arg` outlives the registration; see `vibration_gpio_isr`.
            || unsafe { gpio_isr_handler_add(pin, Some(vibration_gpio_isr), arg) } == ESP_OK,
            || unsafe { gpio_intr_enable(pin) } == ESP_OK,
            || {
                unsafe { gpio_isr_handler_remove(pin) };
            },
        )?;

        // Pulses before this point are not part of any window.
        latch.take();
        info!("Edge source: GPIO{} {:?} edge, interrupt mode", pin, edge);
        Ok(Self { pin, edge, latch })
    }

    /// Simulation: bind to `latch`; tests call [`EdgeLatch::mark`] directly.
    #[cfg(not(target_os = "espidf"))]
    pub fn configure(pin: i32, edge: Edge, latch: &'static EdgeLatch) -> Result<Self, SensorError> {
        check_pin(pin)?;
        latch.take();
        info!("Edge source(sim): GPIO{} {:?} edge, interrupt mode", pin, edge);
        Ok(Self { pin, edge, latch })
    }

    pub fn pin(&self) -> i32 {
        self.pin
    }

    pub fn edge(&self) -> Edge {
        self.edge
    }
}

impl EdgeSource for LatchedEdgeSource {
    fn poll_edge_detected(&mut self) -> Result<bool, SensorError> {
        Ok(self.latch.take())
    }
}

#[cfg(target_os = "espidf")]
impl Drop for LatchedEdgeSource {
    fn drop(&mut self) {
        // SAFETY: removes the handler registered in `configure`.
        unsafe {
            gpio_intr_disable(self.pin);
            gpio_isr_handler_remove(self.pin);
        }
    }
}

// ── Sampled mode ────────────────────────────────────────────────

/// Level-sampling edge source over any `embedded-hal` input.
///
/// Sees at most one edge per poll and misses pulses shorter than the poll
/// interval; use it where the sensor holds its output for longer.
pub struct SampledEdgeSource<P: InputPin> {
    pin: P,
    edge: Edge,
    last_high: Option<bool>,
}

impl<P: InputPin> SampledEdgeSource<P> {
    pub fn new(pin: P, edge: Edge) -> Self {
        info!("Edge source: {:?} edge, sampled mode", edge);
        Self {
            pin,
            edge,
            last_high: None,
        }
    }
}

impl<P: InputPin> EdgeSource for SampledEdgeSource<P> {
    fn poll_edge_detected(&mut self) -> Result<bool, SensorError> {
        let high = self.pin.is_high().map_err(|e| {
            warn!("Edge source: GPIO read failed: {:?}", e);
            SensorError::GpioReadFailed
        })?;

        let detected = match (self.last_high, self.edge) {
            (Some(false), Edge::Rising) => high,
            (Some(true), Edge::Falling) => !high,
            _ => false,
        };
        self.last_high = Some(high);
        Ok(detected)
    }
}
