//! State machine enums for the motion controller.
//!
//! All enums use `#[repr(u8)]` for compact layout and lock-free publication
//! through single-word atomic cells. Conversions back from raw `u8` go
//! through `from_u8` and reject unknown values.

use serde::{Deserialize, Serialize};
use static_assertions::assert_eq_size;

/// Motion controller state, published by the controller after every tick.
///
/// Error states persist until the control surface posts a motion-initiating
/// request; the controller never leaves them on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ControllerState {
    /// All relays open, no motion commanded.
    Stop = 0,
    /// Seeking each axis toward its target independently.
    Run = 1,
    /// Calibration sweep: commanding both axes toward the minima.
    CalStart = 2,
    /// Calibration sweep: waiting for both axes to pin at the low limits.
    CalSeekMins = 3,
    /// Calibration sweep: waiting for both axes to pin at the high limits.
    CalSeekMaxs = 4,
    /// ADC read failed; relays held open.
    ErrAdc = 5,
    /// Rotator AC power lost; relays held open.
    ErrNoPower = 6,
    /// A commanded axis stopped changing; relays held open.
    ErrStuck = 7,
}

assert_eq_size!(ControllerState, u8);

impl ControllerState {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Stop),
            1 => Some(Self::Run),
            2 => Some(Self::CalStart),
            3 => Some(Self::CalSeekMins),
            4 => Some(Self::CalSeekMaxs),
            5 => Some(Self::ErrAdc),
            6 => Some(Self::ErrNoPower),
            7 => Some(Self::ErrStuck),
            _ => None,
        }
    }

    /// True for the three latched fault states.
    #[inline]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::ErrAdc | Self::ErrNoPower | Self::ErrStuck)
    }

    /// True while a calibration sweep is in progress.
    #[inline]
    pub const fn is_calibrating(&self) -> bool {
        matches!(self, Self::CalStart | Self::CalSeekMins | Self::CalSeekMaxs)
    }
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::Stop
    }
}

/// State transition requested by the control surface.
///
/// Written into a mailbox cell and consumed by the controller exactly once
/// at the next tick boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateRequest {
    /// Mailbox empty.
    None = 0,
    /// Open all relays and idle.
    Stop = 1,
    /// Seek the current targets.
    Run = 2,
    /// Begin a calibration sweep against the mechanical limits.
    CalStart = 3,
}

impl StateRequest {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Stop),
            2 => Some(Self::Run),
            3 => Some(Self::CalStart),
            _ => None,
        }
    }
}

impl Default for StateRequest {
    fn default() -> Self {
        Self::None
    }
}

/// Simulator mode selection.
///
/// Any non-`Off` mode synthesizes a valid calibration and narrows the
/// published elevation ceiling; `AzOnly` removes the elevation axis
/// entirely (conversions report 0°).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SimMode {
    /// Real hardware; counts come from the ADC.
    Off = 0,
    /// Azimuth only; elevation pinned at 0°.
    AzOnly = 1,
    /// Both axes, elevation limited to 90°.
    El90 = 2,
    /// Both axes, full 180° elevation.
    El180 = 3,
}

impl SimMode {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Off),
            1 => Some(Self::AzOnly),
            2 => Some(Self::El90),
            3 => Some(Self::El180),
            _ => None,
        }
    }

    /// Effective elevation ceiling [deg] for this mode.
    #[inline]
    pub const fn el_ceiling_deg(&self) -> u16 {
        match self {
            Self::AzOnly => 0,
            Self::El90 => 90,
            Self::Off | Self::El180 => 180,
        }
    }
}

impl Default for SimMode {
    fn default() -> Self {
        Self::Off
    }
}

/// Run-to-limit direction for `move` commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveDir {
    /// Azimuth counter-clockwise, toward the low limit.
    Left,
    /// Azimuth clockwise, toward the high limit.
    Right,
    /// Elevation up, toward the high limit.
    Up,
    /// Elevation down, toward the horizon.
    Down,
}

impl MoveDir {
    /// Decode the Hamlib wire value (`2=UP 4=DOWN 8=LEFT 16=RIGHT`).
    #[inline]
    pub const fn from_hamlib(value: u32) -> Option<Self> {
        match value {
            2 => Some(Self::Up),
            4 => Some(Self::Down),
            8 => Some(Self::Left),
            16 => Some(Self::Right),
            _ => None,
        }
    }
}
