//! Unified error types for the RangeSentry firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! composition root's error handling uniform.  All variants are `Copy` so
//! they pass through task loops without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A pin or ADC operation failed.
    Io(IoError),
    /// A network subsystem failed.
    Net(NetError),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Net(e) => write!(f, "net: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// I/O capability errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoError {
    /// `write()` was called on an analog-bound handle.
    NotAnOutput,
    /// `attach_interrupt()` was called on an analog-bound handle.
    NotInterruptCapable,
    /// The platform GPIO configuration call failed.
    ConfigFailed(i32),
    /// The GPIO ISR service could not be installed.
    IsrInstallFailed(i32),
    /// An ADC conversion failed.
    AdcReadFailed(i32),
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnOutput => write!(f, "analog handle has no output capability"),
            Self::NotInterruptCapable => write!(f, "analog handle cannot attach interrupts"),
            Self::ConfigFailed(rc) => write!(f, "pin config failed (rc={rc})"),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={rc})"),
            Self::AdcReadFailed(rc) => write!(f, "ADC read failed (rc={rc})"),
        }
    }
}

impl From<IoError> for Error {
    fn from(e: IoError) -> Self {
        Self::Io(e)
    }
}

impl std::error::Error for IoError {}

impl embedded_hal::digital::Error for IoError {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

// ---------------------------------------------------------------------------
// Network errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetError {
    /// SSID is empty, too long, or not printable ASCII.
    InvalidSsid,
    /// Password is outside the WPA2 8–64 byte range.
    InvalidPassword,
    /// Association failed after all connection attempts were exhausted.
    ConnectionFailed,
    /// An HTTP request could not be performed.
    HttpRequestFailed,
    /// The MQTT client is not connected to a broker.
    MqttNotConnected,
    /// An MQTT publish or subscribe was rejected.
    MqttOperationFailed,
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
            Self::HttpRequestFailed => write!(f, "HTTP request failed"),
            Self::MqttNotConnected => write!(f, "MQTT client not connected"),
            Self::MqttOperationFailed => write!(f, "MQTT operation failed"),
        }
    }
}

impl From<NetError> for Error {
    fn from(e: NetError) -> Self {
        Self::Net(e)
    }
}

impl std::error::Error for NetError {}
