//! Closed-loop motion controller.
//!
//! One `Controller` owns the HAL and runs the periodic tick forever on a
//! dedicated worker thread. Each tick: consume surface mailboxes, advance
//! the driver, read counts, detect faults, update stall counters, refresh
//! the status bitset, then act per state.
//!
//! ## States
//!
//! - `Stop`: relays open, direction flags clear.
//! - `Run`: seek each axis toward its target independently. An active axis
//!   stops on crossing its target (no deadband); an idle axis starts only
//!   outside the deadband; a stalled axis latches `ErrStuck`.
//! - `CalStart → CalSeekMins → CalSeekMaxs`: sweep both axes against the
//!   mechanical limit switches, latch the endpoints, persist the file.
//! - `ErrAdc | ErrNoPower | ErrStuck`: relays held open until the surface
//!   posts a motion-initiating request.

use std::fmt::Display;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use g5500_common::cal::{CalStore, Calibration, convert};
use g5500_common::consts::{
    AZ_DEADBAND, EL_DEADBAND, MOTION_START_PERIOD, OVERLAP_DEG, POWER_OK_MIN, STALL_TICKS, TICK,
};
use g5500_common::error::RotError;
use g5500_common::state::{ControllerState, StateRequest};
use g5500_common::status::StatusFlags;
use g5500_hal::{AdcChannel, RelayPin, RotatorHal};
use tracing::{debug, info, warn};

use crate::shared::SharedState;

/// Control-loop owner. Exclusively holds the HAL after startup.
pub struct Controller {
    hal: Box<dyn RotatorHal>,
    shared: Arc<SharedState>,
    store: CalStore,
    state: ControllerState,
    prev_az: u16,
    prev_el: u16,
    stall_az: u8,
    stall_el: u8,
    cw: bool,
    ccw: bool,
    up: bool,
    down: bool,
    sweep_min: Option<(u16, u16)>,
}

impl Controller {
    /// Wrap an initialized HAL. The store is where a completed sweep is
    /// persisted.
    pub fn new(hal: Box<dyn RotatorHal>, shared: Arc<SharedState>, store: CalStore) -> Self {
        Self {
            hal,
            shared,
            store,
            state: ControllerState::Stop,
            prev_az: 0,
            prev_el: 0,
            stall_az: 0,
            stall_el: 0,
            cw: false,
            ccw: false,
            up: false,
            down: false,
            sweep_min: None,
        }
    }

    /// Spawn the tick loop on its own worker thread.
    ///
    /// The handle is never joined; the loop is bounded by process lifetime.
    pub fn spawn(self) -> std::io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("g5500-controller".into())
            .spawn(move || self.run())
    }

    /// Tick forever, sleeping [`TICK`] between iterations.
    pub fn run(mut self) {
        info!("motion controller started");
        let mut last = Instant::now();
        loop {
            let dt = last.elapsed();
            last = Instant::now();
            self.tick(dt);
            thread::sleep(TICK);
        }
    }

    /// One control cycle. `dt` is the elapsed time since the previous tick
    /// (the simulation driver integrates motion over it).
    pub fn tick(&mut self, dt: Duration) {
        // Surface mailboxes are consumed first so this tick acts on them.
        if let Some(mode) = self.shared.take_sim_request() {
            self.hal.set_sim_mode(mode);
        }
        match self.shared.take_state_request() {
            StateRequest::None => {}
            StateRequest::Stop => {
                self.all_stop();
                self.set_state(ControllerState::Stop);
            }
            StateRequest::Run => self.set_state(ControllerState::Run),
            StateRequest::CalStart => self.set_state(ControllerState::CalStart),
        }

        self.hal.advance(dt);

        let az = match self.hal.read_adc(AdcChannel::Az) {
            Ok(counts) => counts,
            Err(e) => return self.fault(ControllerState::ErrAdc, RotError::AdcFail, &e),
        };
        let el = match self.hal.read_adc(AdcChannel::El) {
            Ok(counts) => counts,
            Err(e) => return self.fault(ControllerState::ErrAdc, RotError::AdcFail, &e),
        };
        self.shared.publish_adc(az, el);

        match self.hal.read_adc(AdcChannel::Power) {
            Ok(counts) if counts < POWER_OK_MIN => {
                self.fault(
                    ControllerState::ErrNoPower,
                    RotError::NoPower,
                    &format_args!("power rail at {counts} counts"),
                );
            }
            Ok(_) => {}
            Err(e) => return self.fault(ControllerState::ErrAdc, RotError::AdcFail, &e),
        }

        // Stall counters: a commanded axis whose reading repeats.
        self.stall_az = if (self.cw || self.ccw) && az == self.prev_az {
            (self.stall_az + 1).min(STALL_TICKS)
        } else {
            0
        };
        self.stall_el = if (self.up || self.down) && el == self.prev_el {
            (self.stall_el + 1).min(STALL_TICKS)
        } else {
            0
        };
        self.prev_az = az;
        self.prev_el = el;

        self.publish_status();

        match self.state {
            ControllerState::Stop
            | ControllerState::ErrAdc
            | ControllerState::ErrNoPower
            | ControllerState::ErrStuck => self.all_stop(),
            ControllerState::Run => self.run_axes(az, el),
            ControllerState::CalStart => {
                info!("calibration sweep: seeking minima");
                self.drive_az(Some(false));
                self.drive_el(Some(false));
                thread::sleep(MOTION_START_PERIOD);
                self.stall_az = 0;
                self.stall_el = 0;
                self.set_state(ControllerState::CalSeekMins);
            }
            ControllerState::CalSeekMins => {
                if self.both_axes_stalled() {
                    self.sweep_min = Some((az, el));
                    info!(az_min = az, el_min = el, "minima latched; seeking maxima");
                    self.drive_az(Some(true));
                    self.drive_el(Some(true));
                    thread::sleep(MOTION_START_PERIOD);
                    self.stall_az = 0;
                    self.stall_el = 0;
                    self.set_state(ControllerState::CalSeekMaxs);
                }
            }
            ControllerState::CalSeekMaxs => {
                if self.both_axes_stalled() {
                    self.finish_sweep(az, el);
                }
            }
        }
    }

    // ─── State helpers ──────────────────────────────────────────────

    fn set_state(&mut self, state: ControllerState) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, "controller state");
        }
        self.state = state;
        self.shared.set_state(state);
    }

    /// Latch a persistent fault: relays open, flags clear, error published.
    ///
    /// Latches only on entry; while the state is unchanged the surface is
    /// owed at most one report per latch.
    fn fault(&mut self, state: ControllerState, err: RotError, reason: &dyn Display) {
        self.all_stop();
        if self.state != state {
            warn!(%reason, ?state, "controller fault");
            self.set_state(state);
            self.shared.latch_error(err);
        }
        self.publish_status();
    }

    fn both_axes_stalled(&self) -> bool {
        self.stall_az >= STALL_TICKS && self.stall_el >= STALL_TICKS
    }

    // ─── Motion ─────────────────────────────────────────────────────

    /// Seek both axes toward their targets. Targets are read fresh here, so
    /// a surface write earlier in the same tick wins over a stop check.
    fn run_axes(&mut self, az: u16, el: u16) {
        let (target_az, target_el) = self.shared.targets();

        if self.cw || self.ccw {
            if self.stall_az >= STALL_TICKS {
                return self.fault(
                    ControllerState::ErrStuck,
                    RotError::Stuck,
                    &format_args!("azimuth stuck at {az} counts"),
                );
            }
            let crossed = if self.cw { az >= target_az } else { az <= target_az };
            if crossed {
                self.drive_az(None);
            }
        } else if az.abs_diff(target_az) > AZ_DEADBAND {
            self.drive_az(Some(target_az > az));
        }

        if self.up || self.down {
            if self.stall_el >= STALL_TICKS {
                return self.fault(
                    ControllerState::ErrStuck,
                    RotError::Stuck,
                    &format_args!("elevation stuck at {el} counts"),
                );
            }
            let crossed = if self.up { el >= target_el } else { el <= target_el };
            if crossed {
                self.drive_el(None);
            }
        } else if el.abs_diff(target_el) > EL_DEADBAND {
            self.drive_el(Some(target_el > el));
        }
    }

    /// Drive azimuth: `Some(true)` = CW, `Some(false)` = CCW, `None` = stop.
    ///
    /// The opposing flag is always cleared before its sibling is set, so
    /// both lines are never high together even transiently.
    fn drive_az(&mut self, dir: Option<bool>) {
        let (want_cw, want_ccw) = match dir {
            Some(true) => (true, false),
            Some(false) => (false, true),
            None => (false, false),
        };
        if self.cw && !want_cw {
            self.cw = false;
            self.pin(RelayPin::AzCw, false);
        }
        if self.ccw && !want_ccw {
            self.ccw = false;
            self.pin(RelayPin::AzCcw, false);
        }
        if want_cw && !self.cw {
            self.cw = true;
            self.pin(RelayPin::AzCw, true);
        }
        if want_ccw && !self.ccw {
            self.ccw = true;
            self.pin(RelayPin::AzCcw, true);
        }
        self.shared.set_dirs(self.cw, self.ccw, self.up, self.down);
    }

    /// Drive elevation: `Some(true)` = up, `Some(false)` = down, `None` = stop.
    fn drive_el(&mut self, dir: Option<bool>) {
        let (want_up, want_down) = match dir {
            Some(true) => (true, false),
            Some(false) => (false, true),
            None => (false, false),
        };
        if self.up && !want_up {
            self.up = false;
            self.pin(RelayPin::ElUp, false);
        }
        if self.down && !want_down {
            self.down = false;
            self.pin(RelayPin::ElDown, false);
        }
        if want_up && !self.up {
            self.up = true;
            self.pin(RelayPin::ElUp, true);
        }
        if want_down && !self.down {
            self.down = true;
            self.pin(RelayPin::ElDown, true);
        }
        self.shared.set_dirs(self.cw, self.ccw, self.up, self.down);
    }

    /// Open all four relays and clear every direction flag.
    fn all_stop(&mut self) {
        self.drive_az(None);
        self.drive_el(None);
    }

    fn pin(&mut self, pin: RelayPin, high: bool) {
        if let Err(e) = self.hal.set_pin(pin, high) {
            warn!(%e, ?pin, "relay write failed");
        }
    }

    // ─── Calibration sweep ──────────────────────────────────────────

    fn finish_sweep(&mut self, az_max: u16, el_max: u16) {
        self.all_stop();
        let (az_min, el_min) = self.sweep_min.take().unwrap_or((0, 0));
        let cal = Calibration {
            az_min,
            az_max,
            el_min,
            el_max,
        };
        match cal.validate() {
            Ok(()) => {
                if let Err(e) = self.store.save(&cal) {
                    warn!(%e, "calibration save failed; keeping it in memory");
                }
                self.shared.set_cal(Some(cal));
                info!(?cal, "calibration sweep complete");
            }
            Err(e) => {
                warn!(%e, "calibration sweep rejected");
                self.shared.set_cal(None);
            }
        }
        self.set_state(ControllerState::Stop);
    }

    // ─── Status ─────────────────────────────────────────────────────

    fn publish_status(&mut self) {
        let (az, el) = self.shared.adc();
        let mut flags = StatusFlags::empty();
        if self.ccw {
            flags |= StatusFlags::MOVING_LEFT | StatusFlags::MOVING_AZ;
        }
        if self.cw {
            flags |= StatusFlags::MOVING_RIGHT | StatusFlags::MOVING_AZ;
        }
        if self.up {
            flags |= StatusFlags::MOVING_UP | StatusFlags::MOVING_EL;
        }
        if self.down {
            flags |= StatusFlags::MOVING_DOWN | StatusFlags::MOVING_EL;
        }
        if flags.intersects(StatusFlags::MOVING_AZ | StatusFlags::MOVING_EL) {
            flags |= StatusFlags::MOVING;
        }
        if let Some(cal) = self.shared.cal() {
            if az <= cal.az_min {
                flags |= StatusFlags::LIMIT_LEFT;
            }
            if az >= cal.az_max {
                flags |= StatusFlags::LIMIT_RIGHT;
            }
            if self.shared.el_ceiling() > 0 {
                if el <= cal.el_min {
                    flags |= StatusFlags::LIMIT_DOWN;
                }
                if el >= cal.el_max {
                    flags |= StatusFlags::LIMIT_UP;
                }
            }
            if convert::adc_to_az(az, &cal) >= OVERLAP_DEG {
                flags |= StatusFlags::OVERLAP_RIGHT;
            }
        }
        if !self.state.is_error() {
            flags |= StatusFlags::BUSY;
        }
        self.shared.set_status(flags);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use g5500_common::consts::{SIM_ADC_MIN, SIM_POWER_COUNTS};
    use g5500_common::state::{SimMode, StateRequest};
    use g5500_hal::SimHal;
    use tempfile::TempDir;

    fn rig() -> (Controller, Arc<SharedState>, TempDir) {
        let dir = TempDir::new().unwrap();
        let hal = SimHal::new(SimMode::El180);
        let shared = Arc::new(SharedState::new());
        let store = CalStore::new(dir.path().join("cal.txt"));
        let controller = Controller::new(Box::new(hal), shared.clone(), store);
        (controller, shared, dir)
    }

    #[test]
    fn first_tick_publishes_counts_and_busy() {
        let (mut c, shared, _dir) = rig();
        c.tick(TICK);
        assert_eq!(shared.adc(), (SIM_ADC_MIN, SIM_ADC_MIN));
        assert_eq!(shared.state(), ControllerState::Stop);
        assert!(shared.status().contains(StatusFlags::BUSY));
        assert!(!shared.status().contains(StatusFlags::MOVING));
    }

    #[test]
    fn run_request_is_applied_at_the_next_tick() {
        let (mut c, shared, _dir) = rig();
        shared.set_cal(Some(Calibration::synthetic()));
        shared.set_targets(1000, SIM_ADC_MIN);
        shared.request_state(StateRequest::Run);
        assert_eq!(shared.state(), ControllerState::Stop);
        c.tick(TICK);
        assert_eq!(shared.state(), ControllerState::Run);
        let (cw, ccw, _, _) = shared.dirs();
        assert!(cw && !ccw);
    }

    #[test]
    fn power_rail_value_is_sane_in_simulation() {
        assert!(SIM_POWER_COUNTS >= POWER_OK_MIN);
    }
}
