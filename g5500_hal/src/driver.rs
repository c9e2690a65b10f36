//! HAL driver trait and error types.
//!
//! This module defines:
//! - `RotatorHal` trait - the capability set consumed by the controller
//! - `HalError` enum - error types for HAL operations
//! - `AdcChannel` / `RelayPin` - the fixed channel and pin assignments

use std::time::Duration;

use g5500_common::state::SimMode;
use thiserror::Error;

/// Error types for HAL operations.
#[derive(Debug, Clone, Error)]
pub enum HalError {
    /// Driver initialization failed.
    #[error("initialization failed: {0}")]
    InitFailed(String),

    /// An ADC conversion could not be read.
    #[error("ADC read failed: {0}")]
    AdcRead(String),

    /// A relay line could not be driven.
    #[error("GPIO write failed: {0}")]
    GpioWrite(String),
}

/// ADS1015 input channel assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AdcChannel {
    /// Azimuth potentiometer wiper.
    Az = 0,
    /// Elevation potentiometer wiper.
    El = 1,
    /// Rotator AC power sense rail.
    Power = 2,
}

/// Relay output lines, BCM numbering, all active-high.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RelayPin {
    /// Azimuth clockwise.
    AzCw = 25,
    /// Azimuth counter-clockwise.
    AzCcw = 8,
    /// Elevation up.
    ElUp = 7,
    /// Elevation down.
    ElDown = 1,
}

impl RelayPin {
    /// All four lines, for bulk configure/release.
    pub const ALL: [RelayPin; 4] = [
        RelayPin::AzCw,
        RelayPin::AzCcw,
        RelayPin::ElUp,
        RelayPin::ElDown,
    ];

    /// BCM pin number.
    #[inline]
    pub const fn bcm(self) -> u8 {
        self as u8
    }
}

/// Capability set the motion controller drives.
///
/// # Lifecycle
///
/// 1. `init()` - called once before the tick loop starts
/// 2. `advance()` / `read_adc()` / `set_pin()` - called from the tick loop
/// 3. `shutdown()` - called when the daemon stops; releases all lines low
pub trait RotatorHal: Send {
    /// Open devices and drive every relay line low.
    fn init(&mut self) -> Result<(), HalError>;

    /// Release all relay lines and close devices.
    fn shutdown(&mut self) -> Result<(), HalError>;

    /// Single-shot conversion for one channel, clamped to `[0, 2047]`.
    fn read_adc(&mut self, channel: AdcChannel) -> Result<u16, HalError>;

    /// Drive one relay line. Idempotent.
    fn set_pin(&mut self, pin: RelayPin, high: bool) -> Result<(), HalError>;

    /// Per-tick hook with the elapsed time since the previous tick.
    ///
    /// The simulation driver integrates synthetic motion here; hardware
    /// drivers have nothing to do.
    fn advance(&mut self, _dt: Duration) {}

    /// Apply a simulator mode change.
    ///
    /// Hardware drivers ignore this; counts stay real.
    fn set_sim_mode(&mut self, _mode: SimMode) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_pins_match_the_harness() {
        assert_eq!(RelayPin::AzCw.bcm(), 25);
        assert_eq!(RelayPin::AzCcw.bcm(), 8);
        assert_eq!(RelayPin::ElUp.bcm(), 7);
        assert_eq!(RelayPin::ElDown.bcm(), 1);
    }

    #[test]
    fn adc_channels_match_the_harness() {
        assert_eq!(AdcChannel::Az as u8, 0);
        assert_eq!(AdcChannel::El as u8, 1);
        assert_eq!(AdcChannel::Power as u8, 2);
    }
}
