//! # G-5500 Motion Control
//!
//! The core of the rotator daemon: a closed-loop motion controller that
//! owns all hardware access, the calibration sweep state machine, fault
//! latching, and the shared-state contract between the network-facing
//! control surface and the single dedicated I/O worker.
//!
//! ## Ownership
//!
//! - [`controller::Controller`] exclusively owns the HAL and writes the
//!   published counts, state, status and direction flags.
//! - [`surface::Surface`] exclusively writes targets and posts request
//!   mailboxes; many network tasks may share one surface.
//! - [`shared::SharedState`] holds every shared scalar as a single-word
//!   atomic with exactly one writer; no locks anywhere.

pub mod controller;
pub mod shared;
pub mod surface;

pub use crate::controller::Controller;
pub use crate::shared::SharedState;
pub use crate::surface::{RotResult, RotatorCaps, Surface};
