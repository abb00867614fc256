//! Network layer: Wi-Fi station, HTTP client, MQTT connection.
//!
//! Black-box collaborators from the core task set's point of view — they
//! run on the same scheduler (core 0 alongside the indicator tasks) but
//! the core never depends on them.  Each wrapper follows the dual-target
//! pattern: real ESP-IDF services behind `target_os = "espidf"`, an
//! in-memory simulation recording calls everywhere else.

pub mod http;
pub mod mqtt;
pub mod wifi;
