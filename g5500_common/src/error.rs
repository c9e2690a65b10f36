//! Public error codes and calibration-store errors.
//!
//! `RotError` is the fixed taxonomy surfaced to network clients as negative
//! integers. `CalError` is internal to calibration load/save and collapses
//! to "not calibrated" at the control surface.

use thiserror::Error;

/// Public rotator error, one-to-one with the wire codes.
///
/// `Calibrating` and `BadArgs` are transient; `AdcFail`, `NoPower` and
/// `Stuck` are latched by the controller until the operator re-commands
/// motion; `GpioFail` and `Internal` are fatal at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum RotError {
    /// Argument outside the mount bounds.
    #[error("invalid argument")]
    BadArgs,
    /// No valid calibration yet; a sweep has been started. Retry later.
    #[error("calibration in progress")]
    Calibrating,
    /// An ADC read failed.
    #[error("ADC read failed")]
    AdcFail,
    /// The rotator AC power rail reads low.
    #[error("rotator power lost")]
    NoPower,
    /// A commanded axis stopped changing before reaching its target.
    #[error("axis stuck")]
    Stuck,
    /// GPIO or I2C device initialization failed.
    #[error("GPIO initialization failed")]
    GpioFail,
    /// Invariant violation inside the daemon.
    #[error("internal error")]
    Internal,
}

impl RotError {
    /// Negative wire code reported to network clients.
    #[inline]
    pub const fn code(self) -> i32 {
        match self {
            Self::BadArgs => -1,
            Self::Calibrating => -2,
            Self::AdcFail => -3,
            Self::NoPower => -4,
            Self::Stuck => -5,
            Self::GpioFail => -6,
            Self::Internal => -7,
        }
    }

    /// Compact `u8` tag for the latched-error atomic cell; 0 means "none".
    #[inline]
    pub const fn to_tag(self) -> u8 {
        (-self.code()) as u8
    }

    /// Inverse of [`RotError::to_tag`].
    #[inline]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::BadArgs),
            2 => Some(Self::Calibrating),
            3 => Some(Self::AdcFail),
            4 => Some(Self::NoPower),
            5 => Some(Self::Stuck),
            6 => Some(Self::GpioFail),
            7 => Some(Self::Internal),
            _ => None,
        }
    }
}

/// Calibration file load/save errors.
#[derive(Debug, Error)]
pub enum CalError {
    /// Filesystem error reading or writing the calibration file.
    #[error("calibration file I/O: {0}")]
    Io(#[from] std::io::Error),

    /// A required key was absent.
    #[error("calibration key missing: {0}")]
    MissingKey(&'static str),

    /// A value failed to parse or exceeded the 12-bit range.
    #[error("calibration value invalid for {key}: {value}")]
    BadValue {
        /// Offending key.
        key: &'static str,
        /// Raw text as found in the file.
        value: String,
    },

    /// Endpoints violate the minimum-span invariant.
    #[error("calibration span too small: {axis} {min}..{max}")]
    SpanTooSmall {
        /// `"az"` or `"el"`.
        axis: &'static str,
        /// Loaded minimum.
        min: u16,
        /// Loaded maximum.
        max: u16,
    },
}
