//! Ranging task — toggles on button presses, measures while active.
//!
//! The activity flag is a plain local: it is mutated only inside this
//! loop and other tasks learn about it exclusively through the
//! [`RANGING_ACTIVE`] broadcast bit, so it needs no locking.

use log::{debug, info};

use crate::sync::RANGING_ACTIVE;
use crate::tasks::{RangeSensor, SystemContext};
use crate::time::sleep_ms;

/// Run the ranging loop until shutdown is requested.
///
/// Every wait in the body is bounded — the zero-wait toggle probe, the
/// echo timeout inside `sensor.measure()`, and the writer-side lock
/// bound — so a stuck echo line or a slow reader costs at most one
/// skipped cycle, never the scheduling slot.
pub fn ranging_task(ctx: &'static SystemContext, mut sensor: impl RangeSensor) {
    let cfg = &ctx.config;
    let mut active = false;

    info!("ranging task up (inactive)");

    while !ctx.shutdown.is_requested() {
        // Mode toggle: zero-wait probe, then a debounce hold that absorbs
        // contact bounce.  Edges arriving during the hold coalesce into
        // the signal's single outstanding unit or vanish entirely —
        // either way at most one further toggle is observed.
        if ctx.mode_toggle.take() {
            active = !active;
            if active {
                ctx.flags.set(RANGING_ACTIVE);
                info!("ranging start");
            } else {
                ctx.flags.clear(RANGING_ACTIVE);
                info!("ranging stop");
            }
            sleep_ms(cfg.debounce_ms);
            // Edges that bounced during the hold are discarded, not queued.
            let _ = ctx.mode_toggle.take();
            continue;
        }

        if !active {
            sleep_ms(cfg.idle_poll_ms);
            continue;
        }

        match sensor.measure() {
            Some(reading) => {
                // Bounded publish: a reader holding the lock past the
                // bound costs us this sample, nothing more.
                match ctx.reading.lock_within(cfg.writer_lock_timeout()) {
                    Some(mut slot) => *slot = reading,
                    None => debug!("reading dropped: lock contended past bound"),
                }
            }
            None => {
                // Echo timeout — previous reading stays visible
                // (stale-but-valid).
                debug!("measurement cycle abandoned: echo timeout");
            }
        }

        sleep_ms(cfg.measure_interval_ms);
    }

    info!("ranging task down");
}
