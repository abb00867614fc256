//! GPIO / ADC pin assignments for the RangeSentry board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// HC-SR04 ultrasonic ranger
// ---------------------------------------------------------------------------

/// Digital output: 10 µs trigger pulse starts a measurement.
pub const TRIG_GPIO: i32 = 12;
/// Digital input: echo pulse width encodes the round-trip time.
pub const ECHO_GPIO: i32 = 14;

// ---------------------------------------------------------------------------
// User button (active-low with internal pull-up, falling-edge interrupt)
// ---------------------------------------------------------------------------

/// Momentary push-button toggling ranging on/off.
pub const BUTTON_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// Indicators
// ---------------------------------------------------------------------------

/// Digital output: distance-adaptive blink LED.
pub const BLINK_GPIO: i32 = 2;
/// Digital output: solid LED mirroring "ranging active".
pub const STATUS_GPIO: i32 = 18;

// ---------------------------------------------------------------------------
// Joystick (sibling demo wiring — analog axes + button)
// ---------------------------------------------------------------------------

/// ADC1 channel for the joystick X axis.
pub const JOYSTICK_X_ADC_CHANNEL: u32 = 6;
/// ADC1 channel for the joystick Y axis.
pub const JOYSTICK_Y_ADC_CHANNEL: u32 = 4;
/// Digital input: joystick push-button.
pub const JOYSTICK_BUTTON_GPIO: i32 = 15;
