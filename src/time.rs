//! Monotonic time source.
//!
//! - **`target_os = "espidf"`** — wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic).
//! - **`not(target_os = "espidf")`** — uses `std::time::Instant` for
//!   host-side testing and simulation.
//!
//! The echo busy-poll in the ranging task depends on `uptime_us()` being
//! monotonic at microsecond granularity on both backends.

/// Monotonic clock measuring time since boot (or construction, on host).
#[derive(Clone)]
pub struct MonotonicClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot (monotonic, wraps at `u64::MAX`).
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        // SAFETY: esp_timer_get_time is a lock-free RTC counter read.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since boot (monotonic, wraps at `u64::MAX`).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    /// Milliseconds since boot, truncated to u32 (wraps after ~49 days).
    pub fn uptime_ms(&self) -> u32 {
        (self.uptime_us() / 1_000) as u32
    }
}

/// Busy-wait for `us` microseconds.
///
/// Used only for the trigger pulse shaping (2 µs / 10 µs), where a
/// scheduler sleep is far too coarse.  Never call this with large values
/// from a task loop — use [`sleep_ms`] instead.
#[cfg(target_os = "espidf")]
pub fn delay_us(us: u32) {
    // SAFETY: esp_rom_delay_us is a calibrated spin loop with no side effects.
    unsafe { esp_idf_svc::sys::esp_rom_delay_us(us) };
}

/// Busy-wait for `us` microseconds (host spin loop).
#[cfg(not(target_os = "espidf"))]
pub fn delay_us(us: u32) {
    let start = std::time::Instant::now();
    let target = std::time::Duration::from_micros(us as u64);
    while start.elapsed() < target {
        std::hint::spin_loop();
    }
}

/// Suspend the calling task for `ms` milliseconds.
///
/// On ESP-IDF `std::thread::sleep` maps to `vTaskDelay`, yielding the
/// core to other tasks — every task-loop suspension point goes through
/// here.
pub fn sleep_ms(ms: u32) {
    std::thread::sleep(std::time::Duration::from_millis(ms as u64));
}
