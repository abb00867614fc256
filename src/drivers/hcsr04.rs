//! HC-SR04 ultrasonic ranging driver.
//!
//! A measurement is one trigger pulse (low 2 µs, high 10 µs, low) followed
//! by timing the echo line's rising and falling edges against the
//! monotonic microsecond clock.  Both edge waits are busy-polls bounded by
//! an absolute timeout — a missing or stuck echo abandons the cycle
//! instead of stalling the ranging task's scheduling slot.

use log::debug;

use crate::drivers::gpio::{Direction, IoPin};
use crate::error::IoError;
use crate::time::{self, MonotonicClock};

/// Speed of sound at room temperature, in cm/µs.  The echo pulse covers
/// the round trip, hence the divide-by-two in [`distance_from_echo`].
const SPEED_OF_SOUND_CM_PER_US: f32 = 0.0343;

const TRIGGER_SETTLE_US: u32 = 2;
const TRIGGER_PULSE_US: u32 = 10;

/// One ranging measurement.
///
/// Replaced wholesale on every successful cycle — readers never observe a
/// partially written value (the shared-state lock enforces the atomic
/// replace-and-publish).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Distance to the nearest reflector, centimeters.
    pub distance_cm: f32,
    /// Milliseconds since boot at publish time.
    pub timestamp_ms: u32,
}

impl Default for Reading {
    /// Published before any task starts, so the first reader always finds
    /// a valid value.  100 cm lands in the slow blink band.
    fn default() -> Self {
        Self {
            distance_cm: 100.0,
            timestamp_ms: 0,
        }
    }
}

/// Convert an echo pulse width (µs) to a one-way distance (cm).
pub fn distance_from_echo(echo_us: u32) -> f32 {
    (echo_us as f32 * SPEED_OF_SOUND_CM_PER_US) / 2.0
}

/// HC-SR04 bound to its trigger output and echo input.
pub struct HcSr04 {
    trig: IoPin,
    echo: IoPin,
    clock: MonotonicClock,
    /// Bound on each echo edge wait, µs.
    echo_timeout_us: u32,
}

impl HcSr04 {
    pub fn new(
        trig_gpio: i32,
        echo_gpio: i32,
        clock: MonotonicClock,
        echo_timeout_us: u32,
    ) -> Result<Self, IoError> {
        Ok(Self {
            trig: IoPin::digital(trig_gpio, Direction::Output)?,
            echo: IoPin::digital(echo_gpio, Direction::Input)?,
            clock,
            echo_timeout_us,
        })
    }

    /// Perform one measurement cycle.
    ///
    /// Returns `None` when either echo edge fails to arrive within the
    /// timeout; the caller leaves the previously published reading in
    /// place (stale-but-valid policy).
    pub fn measure(&mut self) -> Option<Reading> {
        self.trig.write(false).ok()?;
        time::delay_us(TRIGGER_SETTLE_US);
        self.trig.write(true).ok()?;
        time::delay_us(TRIGGER_PULSE_US);
        self.trig.write(false).ok()?;

        let echo_start = self.wait_for_echo(true)?;
        let echo_end = self.wait_for_echo_from(false, echo_start)?;

        let echo_us = echo_end.saturating_sub(echo_start) as u32;
        Some(Reading {
            distance_cm: distance_from_echo(echo_us),
            timestamp_ms: self.clock.uptime_ms(),
        })
    }

    /// Busy-poll the echo line until it reaches `level`, bounded by the
    /// configured timeout measured from now.
    fn wait_for_echo(&mut self, level: bool) -> Option<u64> {
        let start = self.clock.uptime_us();
        self.wait_for_echo_from(level, start)
    }

    /// Busy-poll the echo line until it reaches `level`, bounded by the
    /// configured timeout measured from `since_us`.
    fn wait_for_echo_from(&mut self, level: bool, since_us: u64) -> Option<u64> {
        let deadline = since_us + self.echo_timeout_us as u64;
        loop {
            let current = self.echo.read().map(|l| l != 0).unwrap_or(false);
            if current == level {
                return Some(self.clock.uptime_us());
            }
            let now = self.clock.uptime_us();
            if now >= deadline {
                debug!(
                    "echo {} edge missed within {}us",
                    if level { "rising" } else { "falling" },
                    self.echo_timeout_us
                );
                return None;
            }
            std::hint::spin_loop();
        }
    }

    /// Simulation handles (trigger, echo) for tests (host builds only).
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_handles(
        &self,
    ) -> (
        std::sync::Arc<crate::drivers::gpio::SimPinState>,
        std::sync::Arc<crate::drivers::gpio::SimPinState>,
    ) {
        (self.trig.sim_handle(), self.echo.sim_handle())
    }
}
