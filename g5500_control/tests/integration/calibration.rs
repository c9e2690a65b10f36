//! Calibration sweep: uncalibrated start, full sweep to both limits,
//! file persistence, and abort by stop.

use g5500_common::cal::CalStore;
use g5500_common::consts::{SIM_ADC_MAX, SIM_ADC_MIN};
use g5500_common::error::RotError;
use g5500_common::state::{ControllerState, SimMode};

use super::harness::rig;

#[test]
fn uncalibrated_motion_runs_a_full_sweep() {
    let mut rig = rig(SimMode::El180);

    // No calibration file: the first motion call starts a sweep.
    assert_eq!(
        rig.surface.set_position(10.0, 10.0),
        Err(RotError::Calibrating)
    );

    rig.tick(1);
    assert!(rig.shared.state().is_calibrating());

    // Drive the sweep to completion: down to the minima, up to the maxima.
    let mut done = false;
    for _ in 0..600 {
        rig.tick(1);
        if rig.shared.state() == ControllerState::Stop {
            done = true;
            break;
        }
    }
    assert!(done, "sweep did not complete");
    assert!(rig.pins_all_low());

    // Endpoints latched at the simulated limit stops and persisted.
    let cal = rig.shared.cal().expect("calibration valid after sweep");
    assert_eq!(cal.az_min, SIM_ADC_MIN);
    assert_eq!(cal.az_max, SIM_ADC_MAX);
    assert_eq!(cal.el_min, SIM_ADC_MIN);
    assert_eq!(cal.el_max, SIM_ADC_MAX);

    let on_disk = CalStore::new(rig.cal_path()).load().unwrap();
    assert_eq!(on_disk, cal);

    // The retried command now succeeds.
    assert!(rig.surface.set_position(10.0, 10.0).is_ok());
    rig.tick(1);
    assert_eq!(rig.shared.state(), ControllerState::Run);
}

#[test]
fn calibration_loads_from_file_without_a_sweep() {
    let mut rig = rig(SimMode::El180);

    let cal = g5500_common::cal::Calibration {
        az_min: 50,
        az_max: 1950,
        el_min: 60,
        el_max: 1960,
    };
    CalStore::new(rig.cal_path()).save(&cal).unwrap();

    assert!(rig.surface.set_position(10.0, 10.0).is_ok());
    assert_eq!(rig.shared.cal(), Some(cal));
    rig.tick(1);
    assert_eq!(rig.shared.state(), ControllerState::Run);
}

#[test]
fn polling_during_a_sweep_does_not_restart_it() {
    let mut rig = rig(SimMode::El180);
    assert_eq!(
        rig.surface.set_position(10.0, 10.0),
        Err(RotError::Calibrating)
    );
    // Past CalStart, partway up the second leg of the sweep.
    rig.tick(10);
    let state = rig.shared.state();
    assert!(state.is_calibrating());

    assert_eq!(rig.surface.get_position(), Err(RotError::Calibrating));
    assert_eq!(
        rig.surface.set_position(20.0, 20.0),
        Err(RotError::Calibrating)
    );
    rig.tick(1);
    // The sweep continued from where it was instead of re-entering CalStart.
    assert_eq!(rig.shared.state(), state);
}

#[test]
fn stop_aborts_a_sweep_and_leaves_it_uncalibrated() {
    let mut rig = rig(SimMode::El180);
    assert_eq!(
        rig.surface.set_position(10.0, 10.0),
        Err(RotError::Calibrating)
    );
    rig.tick(2);
    assert!(rig.shared.state().is_calibrating());

    rig.surface.stop();
    rig.tick(1);
    assert_eq!(rig.shared.state(), ControllerState::Stop);
    assert!(rig.pins_all_low());
    assert_eq!(rig.shared.cal(), None);
    assert!(CalStore::new(rig.cal_path()).load().is_err());
}
