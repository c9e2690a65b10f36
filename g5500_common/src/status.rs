//! Status bitset published by the controller.
//!
//! Refreshed once per tick from the direction flags, calibration limits and
//! controller state. Consumers must treat it as independently fresh with
//! respect to the count cells (no transactional multi-field read).

use bitflags::bitflags;

bitflags! {
    /// Rotator status summary, one word, one writer (the controller).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StatusFlags: u16 {
        /// Any axis is being driven.
        const MOVING        = 1 << 0;
        /// Azimuth axis is being driven.
        const MOVING_AZ     = 1 << 1;
        /// Azimuth driven counter-clockwise.
        const MOVING_LEFT   = 1 << 2;
        /// Azimuth driven clockwise.
        const MOVING_RIGHT  = 1 << 3;
        /// Elevation axis is being driven.
        const MOVING_EL     = 1 << 4;
        /// Elevation driven up.
        const MOVING_UP     = 1 << 5;
        /// Elevation driven down.
        const MOVING_DOWN   = 1 << 6;
        /// Azimuth at or below the calibrated low limit.
        const LIMIT_LEFT    = 1 << 7;
        /// Azimuth at or above the calibrated high limit.
        const LIMIT_RIGHT   = 1 << 8;
        /// Elevation at or above the calibrated high limit.
        const LIMIT_UP      = 1 << 9;
        /// Elevation at or below the calibrated low limit.
        const LIMIT_DOWN    = 1 << 10;
        /// Azimuth past 360°, into the mechanical overlap.
        const OVERLAP_RIGHT = 1 << 11;
        /// Controller is operational (not latched in a fault state).
        const BUSY          = 1 << 12;
    }
}
