//! RangeSentry Firmware — Main Entry Point
//!
//! Composition root: builds the shared context, wires the button
//! interrupt bridge, and spawns the three core-pinned task loops.
//!
//! ```text
//! core 1 (APP_CPU)                    core 0 (PRO_CPU)
//! ┌───────────────┐   SharedReading   ┌───────────────┐
//! │ ranging task  │──────────────────▶│  blink task   │
//! │  (HC-SR04)    │   EventFlags      ├───────────────┤
//! │               │──────────────────▶│  status task  │
//! └───────▲───────┘                   └───────────────┘
//!         │ ToggleSignal                WiFi / HTTP / MQTT
//!    button ISR                         (optional demo)
//! ```
#![deny(unused_must_use)]

mod config;
mod drivers;
mod error;
mod net;
mod pins;
mod sync;
mod tasks;
mod time;

use anyhow::Result;
use log::{info, warn};

use config::SystemConfig;
use drivers::gpio::{ButtonBridge, Direction, IoPin};
use drivers::hcsr04::HcSr04;
use drivers::task_pin::{spawn_on_core, Core};
use tasks::SystemContext;
use time::MonotonicClock;

/// WiFi credentials for the optional network demo.  Left empty, the demo
/// is skipped and the device runs the core task set standalone.
const WIFI_SSID: &str = "";
const WIFI_PASSWORD: &str = "";

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    #[cfg(target_os = "espidf")]
    {
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;
    }

    info!("RangeSentry v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Shared context (owned here, handed to tasks and ISR) ──
    let ctx = SystemContext::leak(SystemConfig::default());

    // ── 3. Hardware ───────────────────────────────────────────
    let _button = ButtonBridge::attach(pins::BUTTON_GPIO, &ctx.mode_toggle)
        .map_err(error::Error::from)?;
    let ranger = HcSr04::new(
        pins::TRIG_GPIO,
        pins::ECHO_GPIO,
        MonotonicClock::new(),
        ctx.config.echo_timeout_us,
    )
    .map_err(error::Error::from)?;
    let blink_led =
        IoPin::digital(pins::BLINK_GPIO, Direction::Output).map_err(error::Error::from)?;
    let status_led =
        IoPin::digital(pins::STATUS_GPIO, Direction::Output).map_err(error::Error::from)?;

    // ── 4. Task set ───────────────────────────────────────────
    // The ranging busy-poll gets the application core to itself; both
    // indicator tasks share the protocol core with the network stack.
    let ranging = spawn_on_core(Core::App, 5, 4, "ranging\0", move || {
        tasks::ranging::ranging_task(ctx, ranger);
    });
    let blink = spawn_on_core(Core::Pro, 4, 4, "blink\0", move || {
        tasks::blink::blink_task(ctx, blink_led);
    });
    let status = spawn_on_core(Core::Pro, 4, 4, "status\0", move || {
        tasks::status::status_task(ctx, status_led);
    });

    info!("task set running; press the button to toggle ranging");

    // ── 5. Optional network demo (never blocks the core tasks) ──
    if WIFI_SSID.is_empty() {
        info!("no WiFi credentials configured; skipping network demo");
    } else if let Err(e) = run_network_demo() {
        warn!("network demo failed: {e} — core tasks unaffected");
    }

    // The task loops never return in normal operation.
    ranging.join().ok();
    blink.join().ok();
    status.join().ok();
    Ok(())
}

/// Boot-time connectivity demo: associate, exercise the HTTP client,
/// announce over Telegram and MQTT, and sample the joystick channels
/// through the analog I/O binding.
fn run_network_demo() -> Result<()> {
    let mut wifi = net::wifi::WifiManager::new(WIFI_SSID, WIFI_PASSWORD)
        .map_err(error::Error::from)?;
    wifi.connect().map_err(error::Error::from)?;

    let mut http = net::http::HttpClient::new();
    let body = http
        .get("https://jsonplaceholder.typicode.com/posts/1")
        .map_err(error::Error::from)?;
    info!("GET response: {body}");
    let body = http
        .post(
            "https://jsonplaceholder.typicode.com/posts",
            "{\"status\":\"ok\"}",
        )
        .map_err(error::Error::from)?;
    info!("POST response: {body}");

    if let Err(e) = http.send_telegram_message("Token", "chat_id", "RangeSentry up") {
        warn!("telegram notice failed: {e}");
    }

    let mut mqtt = net::mqtt::MqttConnection::new();
    mqtt.begin("mqtt://broker.emqx.io").map_err(error::Error::from)?;
    mqtt.publish("rangesentry/status", "{\"boot\":\"ok\"}")
        .map_err(error::Error::from)?;

    let mut joy_x =
        IoPin::analog(pins::JOYSTICK_X_ADC_CHANNEL).map_err(error::Error::from)?;
    let mut joy_y =
        IoPin::analog(pins::JOYSTICK_Y_ADC_CHANNEL).map_err(error::Error::from)?;
    let x = joy_x.read().map_err(error::Error::from)?;
    let y = joy_y.read().map_err(error::Error::from)?;
    info!("joystick: x={x} y={y}");

    Ok(())
}
