//! Adaptive blink indicator task.
//!
//! Maps the latest ranging distance onto a blink half-period: close
//! targets blink fast, distant ones slow.  While ranging is inactive
//! (observed through the broadcast bit, not the ranging task's private
//! flag) the LED falls back to a fixed slow cadence regardless of
//! whatever distance is still stored.

use log::{info, warn};

use crate::config::SystemConfig;
use crate::drivers::gpio::IoPin;
use crate::sync::RANGING_ACTIVE;
use crate::tasks::SystemContext;
use crate::time::sleep_ms;

/// Distance → blink half-period.  Boundary values resolve to the slower
/// (≥) band.
pub fn half_period_for(distance_cm: f32, cfg: &SystemConfig) -> u32 {
    if distance_cm < cfg.near_band_cm {
        cfg.near_half_period_ms
    } else if distance_cm < cfg.mid_band_cm {
        cfg.mid_half_period_ms
    } else {
        cfg.far_half_period_ms
    }
}

/// Run the blink loop until shutdown is requested.
pub fn blink_task(ctx: &'static SystemContext, mut led: IoPin) {
    let cfg = &ctx.config;
    // Carried across iterations: a contended read keeps the previous
    // period (graceful degradation, never a stall).
    let mut half_period_ms = cfg.far_half_period_ms;

    info!("blink task up");

    while !ctx.shutdown.is_requested() {
        // Read-copy-release: take the distance out of the lock before
        // computing anything.
        if let Some(slot) = ctx.reading.lock_within(cfg.reader_lock_timeout()) {
            let distance_cm = slot.distance_cm;
            drop(slot);
            half_period_ms = half_period_for(distance_cm, cfg);
        }

        let period = if ctx.flags.get() & RANGING_ACTIVE != 0 {
            half_period_ms
        } else {
            cfg.inactive_half_period_ms
        };

        if led.write(true).is_err() {
            warn!("blink LED write failed");
        }
        sleep_ms(period);
        let _ = led.write(false);
        sleep_ms(period);
    }

    let _ = led.write(false);
    info!("blink task down");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> SystemConfig {
        SystemConfig::default()
    }

    #[test]
    fn near_band_is_fast() {
        assert_eq!(half_period_for(0.0, &cfg()), 100);
        assert_eq!(half_period_for(9.99, &cfg()), 100);
    }

    #[test]
    fn mid_band() {
        assert_eq!(half_period_for(10.01, &cfg()), 250);
        assert_eq!(half_period_for(29.99, &cfg()), 250);
    }

    #[test]
    fn far_band_is_slow() {
        assert_eq!(half_period_for(30.01, &cfg()), 800);
        assert_eq!(half_period_for(500.0, &cfg()), 800);
    }

    #[test]
    fn boundaries_resolve_to_the_slower_band() {
        assert_eq!(half_period_for(10.0, &cfg()), 250);
        assert_eq!(half_period_for(30.0, &cfg()), 800);
    }
}
