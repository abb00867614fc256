//! Property tests for the pure core logic and the toggle primitive.
//!
//! Runs on host (x86_64) only — proptest is not available for ESP32
//! targets.

#![cfg(not(target_os = "espidf"))]

use proptest::prelude::*;

use rangesentry::config::SystemConfig;
use rangesentry::drivers::hcsr04::distance_from_echo;
use rangesentry::sync::ToggleSignal;
use rangesentry::tasks::blink::half_period_for;

proptest! {
    /// Every distance maps to exactly one of the three configured bands,
    /// with boundaries resolving to the slower (≥) band.
    #[test]
    fn half_period_always_in_a_band(distance in 0.0f32..10_000.0) {
        let cfg = SystemConfig::default();
        let period = half_period_for(distance, &cfg);

        let expected = if distance < cfg.near_band_cm {
            cfg.near_half_period_ms
        } else if distance < cfg.mid_band_cm {
            cfg.mid_half_period_ms
        } else {
            cfg.far_half_period_ms
        };
        prop_assert_eq!(period, expected);
    }

    /// Longer echoes never map to shorter distances.
    #[test]
    fn distance_is_monotonic_in_echo_width(a in 0u32..200_000, b in 0u32..200_000) {
        let (short, long) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(distance_from_echo(short) <= distance_from_echo(long));
    }

    /// The toggle signal behaves exactly like a saturating one-unit
    /// semaphore for any interleaving of gives and takes.
    #[test]
    fn toggle_signal_matches_binary_semaphore_model(ops in proptest::collection::vec(any::<bool>(), 1..200)) {
        let signal = ToggleSignal::new();
        let mut model_pending = false;

        for give in ops {
            if give {
                signal.give();
                model_pending = true;
            } else {
                let took = signal.take();
                prop_assert_eq!(took, model_pending, "take must mirror the model");
                model_pending = false;
            }
        }
    }
}
