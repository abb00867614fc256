//! Unified digital/analog I/O capability.
//!
//! [`IoPin`] binds either to a digital GPIO (settable output, readable
//! input, optional falling/rising-edge interrupt) or to an ADC1 channel
//! (single-shot conversion, no output).  The two bindings share one
//! read/write surface; the mismatched operations fail with a typed
//! [`IoError`] instead of silently doing nothing.
//!
//! ## Dual-target design
//!
//! - **`target_os = "espidf"`** — raw `esp_idf_svc::sys` register calls
//!   (`gpio_config`, `gpio_set_level`, `adc_oneshot_read`), with the ADC1
//!   unit and the GPIO ISR service each installed process-wide exactly
//!   once.
//! - **host** — pin level and ADC sample live in a shared [`SimPinState`]
//!   that tests drive directly; a simulated edge on an interrupt-attached
//!   pin raises the registered signal just like the hardware ISR would.

use crate::error::IoError;
use crate::sync::ToggleSignal;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::{self, ESP_OK};

#[cfg(not(target_os = "espidf"))]
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};
#[cfg(not(target_os = "espidf"))]
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// Configuration types
// ---------------------------------------------------------------------------

/// Direction/mode of a digital binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    /// Input with the internal pull-up enabled (buttons).
    InputPullUp,
    Output,
}

/// Interrupt polarity for [`IoPin::attach_interrupt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

// ---------------------------------------------------------------------------
// Host simulation state
// ---------------------------------------------------------------------------

/// Simulated pin backing store (host builds only).
///
/// Tests clone the handle out of an [`IoPin`] and drive levels / samples
/// while the task loops run against the same state.
#[cfg(not(target_os = "espidf"))]
pub struct SimPinState {
    level: AtomicBool,
    adc_sample: AtomicU16,
    /// Number of ADC conversions performed — lets tests prove reads are
    /// fresh conversions rather than a cached value.
    adc_reads: AtomicU32,
    sink: Mutex<Option<(Edge, &'static ToggleSignal)>>,
}

#[cfg(not(target_os = "espidf"))]
impl SimPinState {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            level: AtomicBool::new(false),
            adc_sample: AtomicU16::new(0),
            adc_reads: AtomicU32::new(0),
            sink: Mutex::new(None),
        })
    }

    /// Drive the digital level, firing the attached interrupt on a
    /// matching transition.
    pub fn drive_level(&self, high: bool) {
        let was_high = self.level.swap(high, Ordering::AcqRel);
        if was_high == high {
            return;
        }
        let sink = self.sink.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some((edge, signal)) = *sink {
            let fired = match edge {
                Edge::Rising => high,
                Edge::Falling => !high,
            };
            if fired {
                signal.give();
            }
        }
    }

    /// Current digital level.
    pub fn level(&self) -> bool {
        self.level.load(Ordering::Acquire)
    }

    /// Set the value the next ADC conversions will return.
    pub fn set_adc_sample(&self, raw: u16) {
        self.adc_sample.store(raw, Ordering::Release);
    }

    /// Number of ADC conversions performed so far.
    pub fn adc_read_count(&self) -> u32 {
        self.adc_reads.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// IoPin
// ---------------------------------------------------------------------------

enum Binding {
    Digital {
        pin: i32,
        direction: Direction,
    },
    Analog {
        channel: u32,
    },
}

/// A handle to one digital pin or one analog channel.
pub struct IoPin {
    binding: Binding,
    #[cfg(not(target_os = "espidf"))]
    sim: Arc<SimPinState>,
}

impl IoPin {
    /// Configure a digital pin.  Outputs start low.
    pub fn digital(pin: i32, direction: Direction) -> Result<Self, IoError> {
        configure_digital(pin, direction)?;
        Ok(Self {
            binding: Binding::Digital { pin, direction },
            #[cfg(not(target_os = "espidf"))]
            sim: SimPinState::new(),
        })
    }

    /// Configure an ADC1 channel for single-shot sampling.
    ///
    /// The first analog binding brings up the shared ADC1 oneshot unit;
    /// subsequent bindings reuse it.
    pub fn analog(channel: u32) -> Result<Self, IoError> {
        configure_analog(channel)?;
        Ok(Self {
            binding: Binding::Analog { channel },
            #[cfg(not(target_os = "espidf"))]
            sim: SimPinState::new(),
        })
    }

    /// Set the output level.  Fails on analog bindings.
    pub fn write(&mut self, high: bool) -> Result<(), IoError> {
        match self.binding {
            Binding::Digital { pin, .. } => {
                #[cfg(target_os = "espidf")]
                {
                    // SAFETY: pin was configured as an output in configure_digital.
                    unsafe { sys::gpio_set_level(pin, u32::from(high)) };
                }
                #[cfg(not(target_os = "espidf"))]
                {
                    let _ = pin;
                    self.sim.drive_level(high);
                }
                Ok(())
            }
            Binding::Analog { .. } => Err(IoError::NotAnOutput),
        }
    }

    /// Read the digital level (0/1) or perform a fresh ADC conversion.
    ///
    /// Analog reads are never cached — every call samples the hardware.
    pub fn read(&mut self) -> Result<u32, IoError> {
        match self.binding {
            Binding::Digital { pin, .. } => {
                #[cfg(target_os = "espidf")]
                {
                    Ok(u32::from(read_digital(pin)))
                }
                #[cfg(not(target_os = "espidf"))]
                {
                    let _ = pin;
                    Ok(u32::from(self.sim.level()))
                }
            }
            Binding::Analog { channel } => {
                #[cfg(target_os = "espidf")]
                {
                    adc1_convert(channel).map(u32::from)
                }
                #[cfg(not(target_os = "espidf"))]
                {
                    let _ = channel;
                    self.sim.adc_reads.fetch_add(1, Ordering::AcqRel);
                    Ok(u32::from(self.sim.adc_sample.load(Ordering::Acquire)))
                }
            }
        }
    }

    /// Register `sink` to be raised from interrupt context on the given
    /// edge.  Fails on analog bindings.
    ///
    /// The first attachment installs the process-wide GPIO ISR service;
    /// the install is idempotent across all attached pins.
    pub fn attach_interrupt(
        &mut self,
        edge: Edge,
        sink: &'static ToggleSignal,
    ) -> Result<(), IoError> {
        match self.binding {
            Binding::Digital { pin, .. } => {
                #[cfg(target_os = "espidf")]
                {
                    attach_hw_interrupt(pin, edge, sink)
                }
                #[cfg(not(target_os = "espidf"))]
                {
                    let _ = pin;
                    let mut slot = self
                        .sim
                        .sink
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner);
                    *slot = Some((edge, sink));
                    Ok(())
                }
            }
            Binding::Analog { .. } => Err(IoError::NotInterruptCapable),
        }
    }

    /// Simulation handle for tests (host builds only).
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_handle(&self) -> Arc<SimPinState> {
        Arc::clone(&self.sim)
    }
}

// ---------------------------------------------------------------------------
// embedded-hal digital traits
// ---------------------------------------------------------------------------

impl embedded_hal::digital::ErrorType for IoPin {
    type Error = IoError;
}

impl embedded_hal::digital::OutputPin for IoPin {
    fn set_low(&mut self) -> Result<(), IoError> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), IoError> {
        self.write(true)
    }
}

impl embedded_hal::digital::InputPin for IoPin {
    fn is_high(&mut self) -> Result<bool, IoError> {
        self.read().map(|level| level != 0)
    }

    fn is_low(&mut self) -> Result<bool, IoError> {
        self.is_high().map(|high| !high)
    }
}

// ---------------------------------------------------------------------------
// Button interrupt bridge
// ---------------------------------------------------------------------------

/// Capability object binding the button pin to its mode-toggle sink.
///
/// Owns the pin handle and the `'static` signal, registered exactly once —
/// the ISR trampoline resolves its context through a pointer stored at
/// registration time, never through a per-call cast of an opaque argument.
/// The ISR body is a single lock-free `give()`; no logging, allocation, or
/// blocking happens in interrupt context.
pub struct ButtonBridge {
    pin: IoPin,
}

impl ButtonBridge {
    /// Configure the button pin (pull-up, falling edge) and register the
    /// toggle signal as its interrupt sink.
    pub fn attach(pin_num: i32, sink: &'static ToggleSignal) -> Result<Self, IoError> {
        let mut pin = IoPin::digital(pin_num, Direction::InputPullUp)?;
        pin.attach_interrupt(Edge::Falling, sink)?;
        Ok(Self { pin })
    }

    /// Current raw button level (true = released for an active-low button).
    pub fn is_high(&mut self) -> Result<bool, IoError> {
        self.pin.read().map(|level| level != 0)
    }

    /// Simulation handle for tests (host builds only).
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_handle(&self) -> Arc<SimPinState> {
        self.pin.sim_handle()
    }
}

// ---------------------------------------------------------------------------
// ESP-IDF backend
// ---------------------------------------------------------------------------

#[cfg(target_os = "espidf")]
fn configure_digital(pin: i32, direction: Direction) -> Result<(), IoError> {
    let (mode, pull_up) = match direction {
        Direction::Input => (sys::gpio_mode_t_GPIO_MODE_INPUT, false),
        Direction::InputPullUp => (sys::gpio_mode_t_GPIO_MODE_INPUT, true),
        Direction::Output => (sys::gpio_mode_t_GPIO_MODE_OUTPUT, false),
    };
    let cfg = sys::gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode,
        pull_up_en: if pull_up {
            sys::gpio_pullup_t_GPIO_PULLUP_ENABLE
        } else {
            sys::gpio_pullup_t_GPIO_PULLUP_DISABLE
        },
        pull_down_en: sys::gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: sys::gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: gpio_config validates the pin mask; called before any task
    // touches the pin.
    let ret = unsafe { sys::gpio_config(&cfg) };
    if ret != ESP_OK {
        return Err(IoError::ConfigFailed(ret));
    }
    if direction == Direction::Output {
        // SAFETY: pin is now a configured output.
        unsafe { sys::gpio_set_level(pin, 0) };
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn configure_digital(_pin: i32, _direction: Direction) -> Result<(), IoError> {
    Ok(())
}

#[cfg(target_os = "espidf")]
fn read_digital(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access on a
    // configured pin.
    (unsafe { sys::gpio_get_level(pin) }) != 0
}

// ── ADC1 oneshot unit (installed once, shared by all analog bindings) ──

#[cfg(target_os = "espidf")]
static ADC1_UNIT: std::sync::OnceLock<AdcUnit> = std::sync::OnceLock::new();

/// Raw ADC1 oneshot handle.  The handle is created once and never freed;
/// `adc_oneshot_read` is internally locked by the driver, so sharing it
/// across tasks is sound.
#[cfg(target_os = "espidf")]
struct AdcUnit(sys::adc_oneshot_unit_handle_t);

#[cfg(target_os = "espidf")]
unsafe impl Send for AdcUnit {}
#[cfg(target_os = "espidf")]
unsafe impl Sync for AdcUnit {}

#[cfg(target_os = "espidf")]
fn configure_analog(channel: u32) -> Result<(), IoError> {
    let unit = match ADC1_UNIT.get() {
        Some(unit) => unit,
        None => {
            let init_cfg = sys::adc_oneshot_unit_init_cfg_t {
                unit_id: sys::adc_unit_t_ADC_UNIT_1,
                ulp_mode: sys::adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
                ..Default::default()
            };
            let mut handle: sys::adc_oneshot_unit_handle_t = core::ptr::null_mut();
            // SAFETY: handle is written once here; losing the race to
            // OnceLock::set leaks one unit handle, which cannot happen in
            // practice because analog bindings are created at startup.
            let ret = unsafe { sys::adc_oneshot_new_unit(&init_cfg, &mut handle) };
            if ret != ESP_OK {
                return Err(IoError::ConfigFailed(ret));
            }
            let _ = ADC1_UNIT.set(AdcUnit(handle));
            ADC1_UNIT.get().expect("ADC1 unit just installed")
        }
    };

    let chan_cfg = sys::adc_oneshot_chan_cfg_t {
        atten: sys::adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: sys::adc_bitwidth_t_ADC_BITWIDTH_DEFAULT,
    };
    // SAFETY: unit handle is valid for the process lifetime.
    let ret = unsafe { sys::adc_oneshot_config_channel(unit.0, channel, &chan_cfg) };
    if ret != ESP_OK {
        return Err(IoError::ConfigFailed(ret));
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn configure_analog(_channel: u32) -> Result<(), IoError> {
    Ok(())
}

#[cfg(target_os = "espidf")]
fn adc1_convert(channel: u32) -> Result<u16, IoError> {
    let unit = ADC1_UNIT
        .get()
        .ok_or(IoError::AdcReadFailed(sys::ESP_ERR_INVALID_STATE))?;
    let mut raw: i32 = 0;
    // SAFETY: unit handle valid for process lifetime; adc_oneshot_read
    // serializes concurrent conversions internally.
    let ret = unsafe { sys::adc_oneshot_read(unit.0, channel, &mut raw) };
    if ret != ESP_OK {
        return Err(IoError::AdcReadFailed(ret));
    }
    Ok(raw.max(0) as u16)
}

// ── GPIO ISR service (installed once, shared by all attached pins) ──

#[cfg(target_os = "espidf")]
static BUTTON_SINK: std::sync::atomic::AtomicPtr<ToggleSignal> =
    std::sync::atomic::AtomicPtr::new(core::ptr::null_mut());

/// ISR trampoline.  Loads the sink registered in [`attach_hw_interrupt`]
/// and performs the one permitted operation: a lock-free `give()`.  The
/// GPIO ISR service handles the higher-priority-waiter yield on exit.
#[cfg(target_os = "espidf")]
unsafe extern "C" fn toggle_gpio_isr(_arg: *mut core::ffi::c_void) {
    let sink = BUTTON_SINK.load(std::sync::atomic::Ordering::Acquire);
    if !sink.is_null() {
        // SAFETY: sink points to a 'static ToggleSignal stored once at
        // registration; never freed or replaced with a dangling pointer.
        unsafe { (*sink).give() };
    }
}

#[cfg(target_os = "espidf")]
fn attach_hw_interrupt(pin: i32, edge: Edge, sink: &'static ToggleSignal) -> Result<(), IoError> {
    let intr_type = match edge {
        Edge::Rising => sys::gpio_int_type_t_GPIO_INTR_POSEDGE,
        Edge::Falling => sys::gpio_int_type_t_GPIO_INTR_NEGEDGE,
    };

    BUTTON_SINK.store(
        sink as *const ToggleSignal as *mut ToggleSignal,
        std::sync::atomic::Ordering::Release,
    );

    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed (acceptable).  The registered handler
    // only performs a lock-free atomic store.
    unsafe {
        let ret = sys::gpio_install_isr_service(0);
        if ret != ESP_OK && ret != sys::ESP_ERR_INVALID_STATE {
            return Err(IoError::IsrInstallFailed(ret));
        }
        sys::gpio_set_intr_type(pin, intr_type);
        let ret = sys::gpio_isr_handler_add(pin, Some(toggle_gpio_isr), core::ptr::null_mut());
        if ret != ESP_OK {
            return Err(IoError::IsrInstallFailed(ret));
        }
        sys::gpio_intr_enable(pin);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaked_signal() -> &'static ToggleSignal {
        Box::leak(Box::new(ToggleSignal::new()))
    }

    #[test]
    fn analog_handle_rejects_write() {
        let mut pin = IoPin::analog(6).unwrap();
        assert_eq!(pin.write(true), Err(IoError::NotAnOutput));
    }

    #[test]
    fn analog_handle_rejects_interrupt() {
        let mut pin = IoPin::analog(6).unwrap();
        assert_eq!(
            pin.attach_interrupt(Edge::Falling, leaked_signal()),
            Err(IoError::NotInterruptCapable)
        );
    }

    #[test]
    fn digital_write_read_round_trip() {
        let mut pin = IoPin::digital(2, Direction::Output).unwrap();
        pin.write(true).unwrap();
        assert_eq!(pin.read().unwrap(), 1);
        pin.write(false).unwrap();
        assert_eq!(pin.read().unwrap(), 0);
    }

    #[test]
    fn analog_reads_are_fresh_conversions() {
        let mut pin = IoPin::analog(4).unwrap();
        let sim = pin.sim_handle();
        sim.set_adc_sample(2048);

        assert_eq!(pin.read().unwrap(), 2048);
        assert_eq!(pin.read().unwrap(), 2048);
        assert_eq!(sim.adc_read_count(), 2, "each read performs a conversion");

        sim.set_adc_sample(100);
        assert_eq!(pin.read().unwrap(), 100, "no stale cached sample");
    }

    #[test]
    fn falling_edge_raises_sink() {
        let sink = leaked_signal();
        let mut bridge = ButtonBridge::attach(4, sink).unwrap();
        let sim = bridge.sim_handle();

        sim.drive_level(true); // released (pull-up)
        assert!(!sink.take(), "rising edge must not fire a falling-edge sink");

        sim.drive_level(false); // pressed
        assert!(sink.take());
        assert!(bridge.is_high().map(|h| !h).unwrap());
    }

    #[test]
    fn repeated_same_level_fires_nothing() {
        let sink = leaked_signal();
        let bridge = ButtonBridge::attach(4, sink).unwrap();
        let sim = bridge.sim_handle();

        sim.drive_level(false);
        let _ = sink.take();
        sim.drive_level(false);
        assert!(!sink.take(), "no transition, no signal");
    }
}
