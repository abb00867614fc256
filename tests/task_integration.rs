//! Integration tests running the real task loops on host threads against
//! simulated pins.  Host only — the simulation backend does not exist on
//! ESP32 targets.

#![cfg(not(target_os = "espidf"))]

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rangesentry::config::SystemConfig;
use rangesentry::drivers::gpio::{ButtonBridge, Direction, IoPin, SimPinState};
use rangesentry::drivers::hcsr04::Reading;
use rangesentry::sync::RANGING_ACTIVE;
use rangesentry::tasks::{blink, ranging, status, RangeSensor, SystemContext};

// ── Test fixtures ─────────────────────────────────────────────

/// Fast timing so a whole scenario fits in tens of milliseconds.
fn test_config() -> SystemConfig {
    SystemConfig {
        debounce_ms: 150,
        idle_poll_ms: 5,
        measure_interval_ms: 10,
        echo_timeout_us: 5_000,
        writer_lock_timeout_ms: 50,
        reader_lock_timeout_ms: 10,
        near_half_period_ms: 10,
        mid_half_period_ms: 25,
        far_half_period_ms: 60,
        inactive_half_period_ms: 120,
        near_band_cm: 10.0,
        mid_band_cm: 30.0,
        status_refresh_ms: 20,
    }
}

/// Scripted measurement source: returns each entry once, then repeats the
/// final entry forever.
struct ScriptedRanger {
    script: Vec<Option<Reading>>,
    index: usize,
}

impl ScriptedRanger {
    fn new(script: Vec<Option<Reading>>) -> Self {
        Self { script, index: 0 }
    }

    fn always(reading: Option<Reading>) -> Self {
        Self::new(vec![reading])
    }
}

impl RangeSensor for ScriptedRanger {
    fn measure(&mut self) -> Option<Reading> {
        let entry = self.script[self.index.min(self.script.len() - 1)];
        self.index += 1;
        entry
    }
}

struct Harness {
    ctx: &'static SystemContext,
    button: Arc<SimPinState>,
    _bridge: ButtonBridge,
    ranging: JoinHandle<()>,
}

impl Harness {
    fn start(config: SystemConfig, sensor: impl RangeSensor + Send + 'static) -> Self {
        let ctx = SystemContext::leak(config);
        let bridge = ButtonBridge::attach(4, &ctx.mode_toggle).unwrap();
        let button = bridge.sim_handle();
        button.drive_level(true); // released (pull-up idle level)

        let ranging = thread::spawn(move || ranging::ranging_task(ctx, sensor));
        Self {
            ctx,
            button,
            _bridge: bridge,
            ranging,
        }
    }

    /// One press-and-release, waiting long enough for the ranging task to
    /// consume the toggle and finish its debounce hold.
    fn press_button_settled(&self) {
        self.button.drive_level(false);
        thread::sleep(Duration::from_millis(5));
        self.button.drive_level(true);
        thread::sleep(Duration::from_millis(
            self.ctx.config.debounce_ms as u64 + 60,
        ));
    }

    fn ranging_active(&self) -> bool {
        self.ctx.flags.get() & RANGING_ACTIVE != 0
    }

    fn current_reading(&self) -> Reading {
        *self
            .ctx
            .reading
            .lock_within(Duration::from_millis(100))
            .expect("reading lock uncontended in test")
    }

    fn stop(self) {
        self.ctx.shutdown.request();
        self.ranging.join().unwrap();
    }
}

/// Poll `predicate` until it holds or `timeout` expires.
fn wait_until(timeout: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    predicate()
}

// ── Toggle parity and status broadcast ────────────────────────

#[test]
fn toggle_parity_tracks_accepted_presses() {
    let harness = Harness::start(test_config(), ScriptedRanger::always(None));
    assert!(!harness.ranging_active(), "boots inactive");

    harness.press_button_settled();
    assert!(harness.ranging_active(), "odd press count => active");

    harness.press_button_settled();
    assert!(!harness.ranging_active(), "even press count => inactive");

    harness.press_button_settled();
    assert!(harness.ranging_active());

    harness.stop();
}

#[test]
fn edges_inside_debounce_hold_coalesce_to_one_toggle() {
    let harness = Harness::start(test_config(), ScriptedRanger::always(None));

    // First press is accepted; the ranging task enters its debounce hold.
    harness.button.drive_level(false);
    thread::sleep(Duration::from_millis(30));
    harness.button.drive_level(true);

    // Second press 50ms after the first, well inside the 150ms hold.
    thread::sleep(Duration::from_millis(20));
    harness.button.drive_level(false);
    thread::sleep(Duration::from_millis(5));
    harness.button.drive_level(true);

    // After the hold settles, exactly one toggle must have been observed.
    thread::sleep(Duration::from_millis(250));
    assert!(
        harness.ranging_active(),
        "two edges within the debounce window must produce one toggle"
    );

    harness.stop();
}

// ── Reading publication ───────────────────────────────────────

#[test]
fn published_reading_round_trips_exactly() {
    let reading = Reading {
        distance_cm: 15.0,
        timestamp_ms: 1234,
    };
    let harness = Harness::start(test_config(), ScriptedRanger::always(Some(reading)));

    harness.press_button_settled();
    assert!(wait_until(Duration::from_millis(500), || {
        harness.current_reading() == reading
    }));

    let observed = harness.current_reading();
    assert_eq!(observed.distance_cm, 15.0, "no transformation on the way through");
    assert_eq!(observed.timestamp_ms, 1234);

    harness.stop();
}

#[test]
fn echo_timeout_leaves_previous_reading_in_place() {
    let harness = Harness::start(test_config(), ScriptedRanger::always(None));
    let before = harness.current_reading();

    harness.press_button_settled();
    // Several measurement cycles, all abandoned.
    thread::sleep(Duration::from_millis(150));

    assert_eq!(
        harness.current_reading(),
        before,
        "abandoned cycles must not touch the shared reading"
    );
    assert_eq!(before, Reading::default(), "default published before tasks start");

    harness.stop();
}

#[test]
fn no_measurement_while_inactive() {
    let reading = Reading {
        distance_cm: 42.0,
        timestamp_ms: 7,
    };
    let harness = Harness::start(test_config(), ScriptedRanger::always(Some(reading)));

    // Never toggled on: the scripted value must never be published.
    thread::sleep(Duration::from_millis(120));
    assert_eq!(harness.current_reading(), Reading::default());

    harness.stop();
}

// ── Status indicator ──────────────────────────────────────────

#[test]
fn status_led_mirrors_broadcast_bit() {
    let ctx = SystemContext::leak(test_config());
    let led = IoPin::digital(18, Direction::Output).unwrap();
    let led_state = led.sim_handle();

    let handle = thread::spawn(move || status::status_task(ctx, led));

    ctx.flags.set(RANGING_ACTIVE);
    assert!(wait_until(Duration::from_millis(300), || led_state.level()));

    ctx.flags.clear(RANGING_ACTIVE);
    assert!(wait_until(Duration::from_millis(300), || !led_state.level()));

    // Level-triggered: the bit set again is re-observed, not just edges.
    ctx.flags.set(RANGING_ACTIVE);
    assert!(wait_until(Duration::from_millis(300), || led_state.level()));

    ctx.shutdown.request();
    handle.join().unwrap();
}

// ── Adaptive blink ────────────────────────────────────────────

/// Count LED transitions over `window` by polling the sim pin.
fn count_transitions(led: &SimPinState, window: Duration) -> u32 {
    let deadline = Instant::now() + window;
    let mut last = led.level();
    let mut transitions = 0;
    while Instant::now() < deadline {
        let now = led.level();
        if now != last {
            transitions += 1;
            last = now;
        }
        thread::sleep(Duration::from_millis(1));
    }
    transitions
}

#[test]
fn inactive_blink_uses_fixed_slow_cadence() {
    let ctx = SystemContext::leak(test_config());
    // A near-band distance is stored, but ranging is inactive — the blink
    // task must ignore it and use the fixed cadence.
    *ctx.reading.lock_within(Duration::from_millis(50)).unwrap() = Reading {
        distance_cm: 5.0,
        timestamp_ms: 1,
    };

    let led = IoPin::digital(2, Direction::Output).unwrap();
    let led_state = led.sim_handle();
    let handle = thread::spawn(move || blink::blink_task(ctx, led));

    // Fixed 120ms half-period => ~4 transitions in 500ms.  The near band
    // (10ms) would produce ~50.
    let transitions = count_transitions(&led_state, Duration::from_millis(500));
    assert!(
        transitions <= 8,
        "inactive cadence must be slow, saw {transitions} transitions"
    );

    ctx.shutdown.request();
    handle.join().unwrap();
}

#[test]
fn active_near_distance_blinks_fast() {
    let ctx = SystemContext::leak(test_config());
    ctx.flags.set(RANGING_ACTIVE);
    *ctx.reading.lock_within(Duration::from_millis(50)).unwrap() = Reading {
        distance_cm: 5.0,
        timestamp_ms: 1,
    };

    let led = IoPin::digital(2, Direction::Output).unwrap();
    let led_state = led.sim_handle();
    let handle = thread::spawn(move || blink::blink_task(ctx, led));

    // 10ms half-period => ~50 transitions in 500ms; require well above
    // the inactive cadence to avoid scheduler-noise flakiness.
    let transitions = count_transitions(&led_state, Duration::from_millis(500));
    assert!(
        transitions >= 15,
        "near-band cadence must be fast, saw {transitions} transitions"
    );

    ctx.shutdown.request();
    handle.join().unwrap();
}

// ── Shutdown ──────────────────────────────────────────────────

#[test]
fn all_tasks_exit_on_shutdown() {
    let ctx = SystemContext::leak(test_config());
    let blink_led = IoPin::digital(2, Direction::Output).unwrap();
    let status_led = IoPin::digital(18, Direction::Output).unwrap();

    let handles = vec![
        thread::spawn(move || ranging::ranging_task(ctx, ScriptedRanger::always(None))),
        thread::spawn(move || blink::blink_task(ctx, blink_led)),
        thread::spawn(move || status::status_task(ctx, status_led)),
    ];

    thread::sleep(Duration::from_millis(50));
    ctx.shutdown.request();

    let deadline = Instant::now() + Duration::from_secs(2);
    for handle in handles {
        assert!(
            Instant::now() < deadline,
            "tasks must exit promptly after shutdown"
        );
        handle.join().unwrap();
    }
}
