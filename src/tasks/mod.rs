//! The concurrent task set: ranging, adaptive blink, status indicator.
//!
//! Each task is an infinite loop given a reference to the shared
//! [`SystemContext`] at creation.  All cross-task state lives in that
//! context — there are no ambient globals; the composition root owns the
//! context and hands it out.
//!
//! ```text
//! button edge ──ISR──▶ ToggleSignal ──▶ ranging task ──▶ EventFlags ──▶ status task
//!                                            │
//!                                            ▼
//!                                      SharedReading ──▶ blink task
//! ```

pub mod blink;
pub mod ranging;
pub mod status;

use crate::config::SystemConfig;
use crate::drivers::hcsr04::{HcSr04, Reading};
use crate::sync::{BoundedMutex, EventFlags, Shutdown, ToggleSignal};

/// Measurement source for the ranging task.
///
/// The hardware implementation is [`HcSr04`]; test harnesses substitute a
/// scripted sensor to exercise the task loops deterministically.
pub trait RangeSensor {
    /// One measurement cycle; `None` means the echo never arrived and the
    /// cycle was abandoned.
    fn measure(&mut self) -> Option<Reading>;
}

impl RangeSensor for HcSr04 {
    fn measure(&mut self) -> Option<Reading> {
        HcSr04::measure(self)
    }
}

/// Shared state for the whole task set.
///
/// Constructed once by the composition root before any task starts.  The
/// default [`Reading`] is published immediately, so the first reader never
/// observes uninitialized state.
pub struct SystemContext {
    /// Latest ranging measurement (ranging task writes, blink task reads).
    pub reading: BoundedMutex<Reading>,
    /// Button ISR → ranging task mode toggle.
    pub mode_toggle: ToggleSignal,
    /// Ranging task → all observers status broadcast.
    pub flags: EventFlags,
    /// Cooperative cancellation, checked each loop iteration.
    pub shutdown: Shutdown,
    pub config: SystemConfig,
}

impl SystemContext {
    pub fn new(config: SystemConfig) -> Self {
        Self {
            reading: BoundedMutex::new(Reading::default()),
            mode_toggle: ToggleSignal::new(),
            flags: EventFlags::new(),
            shutdown: Shutdown::new(),
            config,
        }
    }

    /// Leak the context to obtain the `'static` reference the ISR bridge
    /// and the task loops require.  Called once at startup (and once per
    /// test harness); the handful of leaked bytes last the process
    /// lifetime by design.
    pub fn leak(config: SystemConfig) -> &'static Self {
        Box::leak(Box::new(Self::new(config)))
    }
}
