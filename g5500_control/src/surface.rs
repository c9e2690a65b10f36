//! Network-facing control surface.
//!
//! Translates position-based requests into targets and state transitions,
//! and translates the controller's latched error state into public error
//! codes. A pending fault is reported exactly once per latch: the motion
//! entry points consume it and send the controller to `Stop` so the retry
//! can proceed, while `get_position` consumes it without commanding the
//! controller, leaving the fault state in force until the operator
//! re-commands motion. Calls that need calibration start a sweep when no
//! usable calibration exists.

use std::sync::Arc;

use g5500_common::cal::{CalStore, Calibration, convert};
use g5500_common::consts::AZ_RANGE_DEG;
use g5500_common::error::RotError;
use g5500_common::state::{MoveDir, SimMode, StateRequest};
use g5500_common::status::StatusFlags;
use tracing::{debug, info};

use crate::shared::SharedState;

/// Result alias for surface operations.
pub type RotResult<T> = Result<T, RotError>;

/// Capability summary answered to `dump_caps`-style queries.
#[derive(Debug, Clone, PartialEq)]
pub struct RotatorCaps {
    /// Model description.
    pub model: &'static str,
    /// Azimuth range [deg].
    pub az_min_deg: f64,
    /// Azimuth range [deg].
    pub az_max_deg: f64,
    /// Elevation range [deg].
    pub el_min_deg: f64,
    /// Effective elevation ceiling [deg]; tracks the simulator mode.
    pub el_max_deg: f64,
    /// Live status bitset.
    pub status: StatusFlags,
}

const MODEL: &str = "Yaesu G-5500 az/el rotator (Raspberry Pi GPIO + ADS1015)";

/// Facade consumed by the network listeners. Cheap to share.
pub struct Surface {
    shared: Arc<SharedState>,
    store: CalStore,
}

impl Surface {
    /// Surface over the given shared state; the store is consulted for
    /// calibration loads.
    pub fn new(shared: Arc<SharedState>, store: CalStore) -> Self {
        Self { shared, store }
    }

    /// Gate for the motion-initiating calls (`set_position`, `move_dir`,
    /// `park`).
    ///
    /// A latched fault is returned once and the controller is sent to
    /// `Stop`, so the next motion call proceeds (or re-latches if the
    /// physical condition persists). Without valid calibration, a file
    /// load is attempted; failing that, a sweep is started and
    /// `Calibrating` returned.
    fn ensure_ready(&self) -> RotResult<()> {
        if let Some(err) = self.shared.take_error() {
            self.shared.request_state(StateRequest::Stop);
            return Err(err);
        }
        self.ensure_calibrated()
    }

    fn ensure_calibrated(&self) -> RotResult<()> {
        // A sweep already in progress must not be restarted by pollers.
        if self.shared.state().is_calibrating() {
            return Err(RotError::Calibrating);
        }
        if self.shared.cal().is_none() {
            match self.store.load() {
                Ok(cal) => {
                    info!(?cal, "calibration loaded from file");
                    self.shared.set_cal(Some(cal));
                }
                Err(e) => {
                    debug!(%e, "no usable calibration; starting sweep");
                    self.shared.request_state(StateRequest::CalStart);
                    return Err(RotError::Calibrating);
                }
            }
        }
        Ok(())
    }

    /// Seek to `(az, el)` degrees.
    pub fn set_position(&self, az_deg: f64, el_deg: f64) -> RotResult<()> {
        let ceiling = f64::from(self.shared.el_ceiling());
        if !az_deg.is_finite()
            || !el_deg.is_finite()
            || !(0.0..=AZ_RANGE_DEG).contains(&az_deg)
            || !(0.0..=ceiling).contains(&el_deg)
        {
            return Err(RotError::BadArgs);
        }
        self.ensure_ready()?;
        let cal = self.shared.cal().ok_or(RotError::Internal)?;
        self.shared.set_targets(
            convert::az_to_adc(az_deg, &cal),
            convert::el_to_adc(el_deg, &cal, self.shared.el_ceiling()),
        );
        self.shared.request_state(StateRequest::Run);
        Ok(())
    }

    /// Run the chosen axis to its calibrated limit.
    pub fn move_dir(&self, dir: MoveDir) -> RotResult<()> {
        if matches!(dir, MoveDir::Up | MoveDir::Down) && self.shared.el_ceiling() == 0 {
            return Err(RotError::BadArgs);
        }
        self.ensure_ready()?;
        let cal = self.shared.cal().ok_or(RotError::Internal)?;
        let (target_az, target_el) = self.shared.targets();
        let (target_az, target_el) = match dir {
            MoveDir::Left => (cal.az_min, target_el),
            MoveDir::Right => (cal.az_max, target_el),
            MoveDir::Up => (target_az, cal.el_max),
            MoveDir::Down => (target_az, cal.el_min),
        };
        self.shared.set_targets(target_az, target_el);
        self.shared.request_state(StateRequest::Run);
        Ok(())
    }

    /// Seek to the rest position (0°, 0°).
    pub fn park(&self) -> RotResult<()> {
        self.ensure_ready()?;
        let cal = self.shared.cal().ok_or(RotError::Internal)?;
        self.shared.set_targets(
            convert::az_to_adc(0.0, &cal),
            convert::el_to_adc(0.0, &cal, self.shared.el_ceiling()),
        );
        self.shared.request_state(StateRequest::Run);
        Ok(())
    }

    /// Preempt any motion. Observed within one tick; never consumes the
    /// error latch and never starts a calibration sweep.
    pub fn stop(&self) {
        self.shared.request_state(StateRequest::Stop);
    }

    /// Current position in degrees.
    ///
    /// A pending fault is reported here exactly once, so a client that
    /// only polls never loses the signal. Unlike the motion calls, this
    /// consumes the latch without commanding the controller: the fault
    /// state persists until the operator re-commands motion, and pure
    /// polling keeps answering `OK` with the last counts.
    pub fn get_position(&self) -> RotResult<(f64, f64)> {
        if let Some(err) = self.shared.take_error() {
            return Err(err);
        }
        self.ensure_calibrated()?;
        let cal = self.shared.cal().ok_or(RotError::Internal)?;
        let (az, el) = self.shared.adc();
        Ok((
            convert::adc_to_az(az, &cal),
            convert::adc_to_el(el, &cal, self.shared.el_ceiling()),
        ))
    }

    /// Select a simulator mode (0 = off).
    ///
    /// Resets the mode, the elevation ceiling, the calibration (synthetic
    /// for non-off modes), all motion state and the error latch, and stops
    /// the controller.
    pub fn set_sim_mode(&self, raw: u8) -> RotResult<()> {
        let mode = SimMode::from_u8(raw).ok_or(RotError::BadArgs)?;
        info!(?mode, "simulator mode selected");

        let _ = self.shared.take_error();
        self.shared.set_cal(None);
        self.shared.set_sim_mode(mode);
        self.shared.set_el_ceiling(mode.el_ceiling_deg());
        if mode == SimMode::Off {
            let (az, el) = self.shared.adc();
            self.shared.set_targets(az, el);
        } else {
            let cal = Calibration::synthetic();
            self.shared.set_targets(cal.az_min, cal.el_min);
            self.shared.set_cal(Some(cal));
        }
        self.shared.request_sim_mode(mode);
        self.shared.request_state(StateRequest::Stop);
        Ok(())
    }

    /// Model description string.
    pub fn get_info(&self) -> &'static str {
        MODEL
    }

    /// Capability summary with the live status bitset.
    pub fn dump_caps(&self) -> RotatorCaps {
        RotatorCaps {
            model: MODEL,
            az_min_deg: 0.0,
            az_max_deg: AZ_RANGE_DEG,
            el_min_deg: 0.0,
            el_max_deg: f64::from(self.shared.el_ceiling()),
            status: self.shared.status(),
        }
    }
}
