//! System configuration parameters.
//!
//! All tunable timing and threshold parameters for RangeSentry.  There is
//! no persistence layer — values are fixed at build time and overridden
//! only by test harnesses constructing a custom config.

use core::time::Duration;

/// Core system configuration.
#[derive(Debug, Clone)]
pub struct SystemConfig {
    // --- Ranging task ---
    /// Hold after an accepted button toggle, absorbing contact bounce.
    pub debounce_ms: u32,
    /// Poll interval while ranging is inactive.
    pub idle_poll_ms: u32,
    /// Pause between successive measurements while active.
    pub measure_interval_ms: u32,
    /// Upper bound on waiting for the echo edge (rise and fall each).
    pub echo_timeout_us: u32,
    /// Writer-side bound on acquiring the shared reading lock.
    pub writer_lock_timeout_ms: u32,

    // --- Adaptive blink indicator ---
    /// Reader-side bound on acquiring the shared reading lock.
    pub reader_lock_timeout_ms: u32,
    /// Blink half-period when distance < `near_band_cm`.
    pub near_half_period_ms: u32,
    /// Blink half-period when `near_band_cm` <= distance < `mid_band_cm`.
    pub mid_half_period_ms: u32,
    /// Blink half-period when distance >= `mid_band_cm`.
    pub far_half_period_ms: u32,
    /// Fixed half-period while ranging is inactive.
    pub inactive_half_period_ms: u32,
    /// Near/mid band boundary (centimeters).
    pub near_band_cm: f32,
    /// Mid/far band boundary (centimeters).
    pub mid_band_cm: f32,

    // --- Status indicator ---
    /// Refresh cadence of the status LED.
    pub status_refresh_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Ranging
            debounce_ms: 300,
            idle_poll_ms: 100,
            measure_interval_ms: 200,
            echo_timeout_us: 100_000,
            writer_lock_timeout_ms: 50,

            // Blink
            reader_lock_timeout_ms: 10,
            near_half_period_ms: 100,
            mid_half_period_ms: 250,
            far_half_period_ms: 800,
            inactive_half_period_ms: 1000,
            near_band_cm: 10.0,
            mid_band_cm: 30.0,

            // Status
            status_refresh_ms: 1000,
        }
    }
}

impl SystemConfig {
    pub fn writer_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.writer_lock_timeout_ms as u64)
    }

    pub fn reader_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.reader_lock_timeout_ms as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = SystemConfig::default();
        assert!(c.near_band_cm < c.mid_band_cm);
        assert!(c.near_half_period_ms < c.mid_half_period_ms);
        assert!(c.mid_half_period_ms < c.far_half_period_ms);
        assert!(c.echo_timeout_us > 0);
        assert!(c.debounce_ms > 0);
    }

    #[test]
    fn lock_bounds_shorter_than_loop_cadence() {
        let c = SystemConfig::default();
        assert!(
            c.writer_lock_timeout_ms < c.measure_interval_ms,
            "a contended write must not consume the whole measurement slot"
        );
        assert!(
            c.reader_lock_timeout_ms < c.near_half_period_ms,
            "a contended read must not distort the fastest blink band"
        );
    }
}
