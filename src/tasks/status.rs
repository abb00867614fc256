//! Status indicator task.
//!
//! Mirrors the `RANGING_ACTIVE` broadcast bit onto a solid LED.  The wait
//! is level-triggered and bounded: each pass re-observes the current bit
//! rather than only transitions, so the OFF branch is always reachable —
//! the broadcast can wake the task early, but the acted-on value is
//! whatever the mask says right now.

use log::{info, warn};

use crate::drivers::gpio::IoPin;
use crate::sync::RANGING_ACTIVE;
use crate::tasks::SystemContext;
use crate::time::sleep_ms;
use std::time::Duration;

/// Run the status loop until shutdown is requested.
pub fn status_task(ctx: &'static SystemContext, mut led: IoPin) {
    let cfg = &ctx.config;
    let refresh = Duration::from_millis(cfg.status_refresh_ms as u64);

    info!("status task up");

    while !ctx.shutdown.is_requested() {
        let bits = ctx.flags.wait_any(RANGING_ACTIVE, refresh);

        if bits & RANGING_ACTIVE != 0 {
            if led.write(true).is_err() {
                warn!("status LED write failed");
            }
            info!("Status ON");
        } else {
            let _ = led.write(false);
            info!("Status OFF");
        }

        sleep_ms(cfg.status_refresh_ms);
    }

    let _ = led.write(false);
    info!("status task down");
}
