//! Target seeking: fresh simulated start, mid-motion retargeting, stop
//! preemption, and the direction-flag invariants.

use g5500_common::cal::convert;
use g5500_common::consts::AZ_DEADBAND;
use g5500_common::state::{ControllerState, SimMode};
use g5500_common::status::StatusFlags;

use super::harness::rig;

#[test]
fn fresh_simulated_start_reports_park_then_seeks() {
    let mut rig = rig(SimMode::El180);
    rig.surface.set_sim_mode(3).unwrap();
    rig.tick(1);

    // Synthesized calibration: position reads (0, 0) immediately.
    let (az, el) = rig.surface.get_position().unwrap();
    assert_eq!((az, el), (0.0, 0.0));

    rig.surface.set_position(90.0, 45.0).unwrap();
    // 90° of azimuth at 10 °/s is ~9 s of simulated time: 45 ticks plus
    // a little margin for the start ramp.
    rig.tick(50);

    let cal = rig.shared.cal().unwrap();
    let target = convert::az_to_adc(90.0, &cal);
    let (adc_az, _) = rig.shared.adc();
    assert!(
        adc_az.abs_diff(target) <= AZ_DEADBAND,
        "azimuth {adc_az} not within deadband of {target}"
    );

    // Both axes arrived and idle; the controller stays in Run.
    assert_eq!(rig.shared.dirs(), (false, false, false, false));
    assert_eq!(rig.shared.state(), ControllerState::Run);
    assert!(rig.pins_all_low());

    let (az, el) = rig.surface.get_position().unwrap();
    assert!((az - 90.0).abs() <= 13.0, "az settled at {az}");
    assert!((el - 45.0).abs() <= 6.0, "el settled at {el}");
}

#[test]
fn at_most_one_direction_per_axis_every_tick() {
    let mut rig = rig(SimMode::El180);
    rig.surface.set_sim_mode(3).unwrap();
    rig.tick(1);
    rig.surface.set_position(200.0, 90.0).unwrap();

    for _ in 0..120 {
        rig.tick(1);
        let (cw, ccw, up, down) = rig.shared.dirs();
        assert!(!(cw && ccw), "both azimuth directions commanded");
        assert!(!(up && down), "both elevation directions commanded");
        assert!(!(rig.sim.pin(g5500_hal::RelayPin::AzCw)
            && rig.sim.pin(g5500_hal::RelayPin::AzCcw)));
        assert!(!(rig.sim.pin(g5500_hal::RelayPin::ElUp)
            && rig.sim.pin(g5500_hal::RelayPin::ElDown)));
    }
}

#[test]
fn moving_flags_track_the_commanded_axes() {
    let mut rig = rig(SimMode::El180);
    rig.surface.set_sim_mode(3).unwrap();
    rig.tick(1);
    rig.surface.set_position(180.0, 0.0).unwrap();
    rig.tick(2);

    let status = rig.shared.status();
    assert!(status.contains(StatusFlags::MOVING));
    assert!(status.contains(StatusFlags::MOVING_AZ));
    assert!(status.contains(StatusFlags::MOVING_RIGHT));
    assert!(!status.contains(StatusFlags::MOVING_EL));
    assert!(status.contains(StatusFlags::BUSY));
}

#[test]
fn retarget_mid_motion_is_honored_next_tick() {
    let mut rig = rig(SimMode::El180);
    rig.surface.set_sim_mode(3).unwrap();
    rig.tick(1);
    rig.surface.set_position(90.0, 0.0).unwrap();
    rig.tick(10);

    // Reverse to a target behind the current position.
    rig.surface.set_position(10.0, 0.0).unwrap();
    rig.tick(60);

    let (az, _) = rig.surface.get_position().unwrap();
    assert!((az - 10.0).abs() <= 13.0, "az settled at {az}");
}

#[test]
fn stop_preempts_within_one_tick() {
    let mut rig = rig(SimMode::El180);
    rig.surface.set_sim_mode(3).unwrap();
    rig.tick(1);
    rig.surface.set_position(300.0, 90.0).unwrap();
    rig.tick(5);
    assert!(rig.sim.any_pin_high());

    rig.surface.stop();
    rig.tick(1);
    assert_eq!(rig.shared.state(), ControllerState::Stop);
    assert_eq!(rig.shared.dirs(), (false, false, false, false));
    assert!(rig.pins_all_low());
}

#[test]
fn overlap_flag_past_360_degrees() {
    let mut rig = rig(SimMode::El180);
    rig.surface.set_sim_mode(3).unwrap();
    rig.tick(1);

    // Angles past 360° stay commandable; only the flag is raised.
    rig.surface.set_position(400.0, 0.0).unwrap();
    rig.tick(250);

    let (az, _) = rig.surface.get_position().unwrap();
    assert!((az - 400.0).abs() <= 13.0, "az settled at {az}");
    assert!(rig.shared.status().contains(StatusFlags::OVERLAP_RIGHT));
}

#[test]
fn park_returns_to_the_origin() {
    let mut rig = rig(SimMode::El180);
    rig.surface.set_sim_mode(3).unwrap();
    rig.tick(1);
    rig.surface.set_position(90.0, 45.0).unwrap();
    rig.tick(60);

    rig.surface.park().unwrap();
    rig.tick(60);

    let cal = rig.shared.cal().unwrap();
    let (adc_az, adc_el) = rig.shared.adc();
    assert!(adc_az.abs_diff(cal.az_min) <= AZ_DEADBAND);
    assert!(adc_el.abs_diff(cal.el_min) <= AZ_DEADBAND);
}
