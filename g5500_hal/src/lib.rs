//! G-5500 Hardware Abstraction Layer
//!
//! The motion controller consumes hardware through the [`RotatorHal`]
//! trait. Two drivers implement it:
//!
//! - [`pi::PiHal`] - real Raspberry Pi: relay lines through memory-mapped
//!   BCM GPIO, potentiometer and power-rail counts through an ADS1015 on
//!   `/dev/i2c-1`.
//! - [`sim::SimHal`] - synthetic counts integrated from the commanded
//!   relay lines, for development and tests.

pub mod driver;
pub mod pi;
pub mod sim;

pub use crate::driver::{AdcChannel, HalError, RelayPin, RotatorHal};
pub use crate::pi::PiHal;
pub use crate::sim::{SimControls, SimHal};
