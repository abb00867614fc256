//! Hardware drivers: the I/O capability, the ultrasonic ranger, and
//! core-pinned task spawning.

pub mod gpio;
pub mod hcsr04;
pub mod task_pin;
