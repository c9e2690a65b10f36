//! Shared scalar state between the controller and the control surface.
//!
//! Every field is a single-word atomic with exactly one writer: the
//! controller publishes counts, state, status and direction flags; the
//! surface writes targets and the request mailboxes. Calibration endpoints
//! are the one documented relaxation: written by the surface on file load
//! or simulator synthesis and by the controller after a sweep, each write
//! guarded by dropping the validity flag first.
//!
//! There is no transactional multi-field read: an observer may see counts
//! updated before status. Consumers treat each field as independently
//! fresh.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU16, Ordering};

use g5500_common::cal::Calibration;
use g5500_common::error::RotError;
use g5500_common::state::{ControllerState, SimMode, StateRequest};
use g5500_common::status::StatusFlags;

const SIM_REQUEST_NONE: u8 = 0xFF;
const ERROR_NONE: u8 = 0;

/// One-writer-per-field shared state, handed around as `Arc<SharedState>`.
#[derive(Debug)]
pub struct SharedState {
    // Controller-written telemetry.
    adc_az: AtomicU16,
    adc_el: AtomicU16,
    state: AtomicU8,
    status: AtomicU16,
    cw: AtomicBool,
    ccw: AtomicBool,
    up: AtomicBool,
    down: AtomicBool,
    latched_error: AtomicU8,

    // Surface-written commands.
    target_az: AtomicU16,
    target_el: AtomicU16,
    state_request: AtomicU8,
    sim_request: AtomicU8,

    // Calibration and simulator configuration.
    cal_az_min: AtomicU16,
    cal_az_max: AtomicU16,
    cal_el_min: AtomicU16,
    cal_el_max: AtomicU16,
    cal_valid: AtomicBool,
    sim_mode: AtomicU8,
    el_ceiling_deg: AtomicU16,
}

impl SharedState {
    /// Fresh state: stopped, uncalibrated, simulator off, full elevation.
    pub fn new() -> Self {
        Self {
            adc_az: AtomicU16::new(0),
            adc_el: AtomicU16::new(0),
            state: AtomicU8::new(ControllerState::Stop as u8),
            status: AtomicU16::new(0),
            cw: AtomicBool::new(false),
            ccw: AtomicBool::new(false),
            up: AtomicBool::new(false),
            down: AtomicBool::new(false),
            latched_error: AtomicU8::new(ERROR_NONE),
            target_az: AtomicU16::new(0),
            target_el: AtomicU16::new(0),
            state_request: AtomicU8::new(StateRequest::None as u8),
            sim_request: AtomicU8::new(SIM_REQUEST_NONE),
            cal_az_min: AtomicU16::new(0),
            cal_az_max: AtomicU16::new(0),
            cal_el_min: AtomicU16::new(0),
            cal_el_max: AtomicU16::new(0),
            cal_valid: AtomicBool::new(false),
            sim_mode: AtomicU8::new(SimMode::Off as u8),
            el_ceiling_deg: AtomicU16::new(SimMode::Off.el_ceiling_deg()),
        }
    }

    // ─── Telemetry (writer: controller) ─────────────────────────────

    /// Publish the most recent counts.
    pub fn publish_adc(&self, az: u16, el: u16) {
        self.adc_az.store(az, Ordering::SeqCst);
        self.adc_el.store(el, Ordering::SeqCst);
    }

    /// Latest published counts.
    pub fn adc(&self) -> (u16, u16) {
        (
            self.adc_az.load(Ordering::SeqCst),
            self.adc_el.load(Ordering::SeqCst),
        )
    }

    /// Publish the controller state.
    pub fn set_state(&self, state: ControllerState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// Current controller state.
    pub fn state(&self) -> ControllerState {
        ControllerState::from_u8(self.state.load(Ordering::SeqCst))
            .unwrap_or(ControllerState::Stop)
    }

    /// Publish the status bitset.
    pub fn set_status(&self, flags: StatusFlags) {
        self.status.store(flags.bits(), Ordering::SeqCst);
    }

    /// Latest status bitset.
    pub fn status(&self) -> StatusFlags {
        StatusFlags::from_bits_truncate(self.status.load(Ordering::SeqCst))
    }

    /// Publish the direction flags.
    pub fn set_dirs(&self, cw: bool, ccw: bool, up: bool, down: bool) {
        self.cw.store(cw, Ordering::SeqCst);
        self.ccw.store(ccw, Ordering::SeqCst);
        self.up.store(up, Ordering::SeqCst);
        self.down.store(down, Ordering::SeqCst);
    }

    /// Direction flags as `(cw, ccw, up, down)`.
    pub fn dirs(&self) -> (bool, bool, bool, bool) {
        (
            self.cw.load(Ordering::SeqCst),
            self.ccw.load(Ordering::SeqCst),
            self.up.load(Ordering::SeqCst),
            self.down.load(Ordering::SeqCst),
        )
    }

    /// Latch a persistent error for the surface to report once.
    pub fn latch_error(&self, err: RotError) {
        self.latched_error.store(err.to_tag(), Ordering::SeqCst);
    }

    /// Consume the latched error, if any.
    pub fn take_error(&self) -> Option<RotError> {
        RotError::from_tag(self.latched_error.swap(ERROR_NONE, Ordering::SeqCst))
    }

    // ─── Commands (writer: surface) ─────────────────────────────────

    /// Write both axis targets [counts].
    pub fn set_targets(&self, az: u16, el: u16) {
        self.target_az.store(az, Ordering::SeqCst);
        self.target_el.store(el, Ordering::SeqCst);
    }

    /// Current targets [counts].
    pub fn targets(&self) -> (u16, u16) {
        (
            self.target_az.load(Ordering::SeqCst),
            self.target_el.load(Ordering::SeqCst),
        )
    }

    /// Post a state request; the last write before a tick wins.
    pub fn request_state(&self, request: StateRequest) {
        self.state_request.store(request as u8, Ordering::SeqCst);
    }

    /// Consume the pending state request (controller, once per tick).
    pub fn take_state_request(&self) -> StateRequest {
        StateRequest::from_u8(
            self.state_request
                .swap(StateRequest::None as u8, Ordering::SeqCst),
        )
        .unwrap_or(StateRequest::None)
    }

    /// Post a simulator mode for the controller to forward to the HAL.
    pub fn request_sim_mode(&self, mode: SimMode) {
        self.sim_request.store(mode as u8, Ordering::SeqCst);
    }

    /// Consume the pending simulator mode request.
    pub fn take_sim_request(&self) -> Option<SimMode> {
        SimMode::from_u8(self.sim_request.swap(SIM_REQUEST_NONE, Ordering::SeqCst))
    }

    // ─── Calibration / simulator configuration ──────────────────────

    /// Replace the calibration. `None` invalidates.
    ///
    /// The validity flag drops before the endpoints change and rises only
    /// after they are all written.
    pub fn set_cal(&self, cal: Option<Calibration>) {
        self.cal_valid.store(false, Ordering::SeqCst);
        if let Some(cal) = cal {
            self.cal_az_min.store(cal.az_min, Ordering::SeqCst);
            self.cal_az_max.store(cal.az_max, Ordering::SeqCst);
            self.cal_el_min.store(cal.el_min, Ordering::SeqCst);
            self.cal_el_max.store(cal.el_max, Ordering::SeqCst);
            self.cal_valid.store(true, Ordering::SeqCst);
        }
    }

    /// Current calibration, if valid.
    pub fn cal(&self) -> Option<Calibration> {
        if !self.cal_valid.load(Ordering::SeqCst) {
            return None;
        }
        Some(Calibration {
            az_min: self.cal_az_min.load(Ordering::SeqCst),
            az_max: self.cal_az_max.load(Ordering::SeqCst),
            el_min: self.cal_el_min.load(Ordering::SeqCst),
            el_max: self.cal_el_max.load(Ordering::SeqCst),
        })
    }

    /// Record the active simulator mode.
    pub fn set_sim_mode(&self, mode: SimMode) {
        self.sim_mode.store(mode as u8, Ordering::SeqCst);
    }

    /// Active simulator mode.
    pub fn sim_mode(&self) -> SimMode {
        SimMode::from_u8(self.sim_mode.load(Ordering::SeqCst)).unwrap_or(SimMode::Off)
    }

    /// Set the effective elevation ceiling [deg].
    pub fn set_el_ceiling(&self, deg: u16) {
        self.el_ceiling_deg.store(deg, Ordering::SeqCst);
    }

    /// Effective elevation ceiling [deg].
    pub fn el_ceiling(&self) -> u16 {
        self.el_ceiling_deg.load(Ordering::SeqCst)
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_defaults() {
        let s = SharedState::new();
        assert_eq!(s.state(), ControllerState::Stop);
        assert_eq!(s.take_state_request(), StateRequest::None);
        assert_eq!(s.take_sim_request(), None);
        assert_eq!(s.take_error(), None);
        assert_eq!(s.cal(), None);
        assert_eq!(s.el_ceiling(), 180);
    }

    #[test]
    fn state_request_is_consumed_once() {
        let s = SharedState::new();
        s.request_state(StateRequest::Run);
        assert_eq!(s.take_state_request(), StateRequest::Run);
        assert_eq!(s.take_state_request(), StateRequest::None);
    }

    #[test]
    fn last_state_request_wins() {
        let s = SharedState::new();
        s.request_state(StateRequest::Run);
        s.request_state(StateRequest::Stop);
        assert_eq!(s.take_state_request(), StateRequest::Stop);
    }

    #[test]
    fn sim_request_is_consumed_once() {
        let s = SharedState::new();
        s.request_sim_mode(SimMode::El90);
        assert_eq!(s.take_sim_request(), Some(SimMode::El90));
        assert_eq!(s.take_sim_request(), None);
    }

    #[test]
    fn error_latch_is_consumed_once() {
        let s = SharedState::new();
        s.latch_error(RotError::NoPower);
        assert_eq!(s.take_error(), Some(RotError::NoPower));
        assert_eq!(s.take_error(), None);
    }

    #[test]
    fn calibration_round_trip_and_invalidation() {
        let s = SharedState::new();
        let cal = Calibration::synthetic();
        s.set_cal(Some(cal));
        assert_eq!(s.cal(), Some(cal));
        s.set_cal(None);
        assert_eq!(s.cal(), None);
    }
}
