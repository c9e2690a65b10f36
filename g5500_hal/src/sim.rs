//! Simulation driver.
//!
//! `SimHal` emulates the rotator without hardware: each [`advance`] call
//! integrates synthetic ADC counts for every axis whose relay line is
//! commanded, at the fixed simulated rotation rates, clamped to the
//! synthetic endpoints. A shared [`SimControls`] handle lets tests force
//! faults, freeze an axis or drop the power rail while the controller owns
//! the driver.
//!
//! [`advance`]: crate::driver::RotatorHal::advance

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};
use std::time::Duration;

use g5500_common::consts::{
    AZ_RANGE_DEG, SIM_ADC_MAX, SIM_ADC_MIN, SIM_AZ_DEG_PER_SEC, SIM_EL_DEG_PER_SEC,
    SIM_POWER_COUNTS,
};
use g5500_common::state::SimMode;
use tracing::{debug, info};

use crate::driver::{AdcChannel, HalError, RelayPin, RotatorHal};

const MDEG: f64 = 1000.0;

/// Shared override/observation handle for the simulation driver.
///
/// The controller owns the `SimHal` once spawned; tests keep a clone of
/// this handle to inject faults and observe the relay lines.
#[derive(Debug)]
pub struct SimControls {
    az_speed_mdeg_s: AtomicU32,
    el_speed_mdeg_s: AtomicU32,
    power_counts: AtomicU16,
    adc_fault: AtomicBool,
    pins: [AtomicBool; 4],
}

impl SimControls {
    fn new() -> Self {
        Self {
            az_speed_mdeg_s: AtomicU32::new((SIM_AZ_DEG_PER_SEC * MDEG) as u32),
            el_speed_mdeg_s: AtomicU32::new((SIM_EL_DEG_PER_SEC * MDEG) as u32),
            power_counts: AtomicU16::new(SIM_POWER_COUNTS),
            adc_fault: AtomicBool::new(false),
            pins: [const { AtomicBool::new(false) }; 4],
        }
    }

    /// Override the simulated azimuth rate [deg/s]. Zero pins the axis.
    pub fn set_az_speed(&self, deg_per_sec: f64) {
        self.az_speed_mdeg_s
            .store((deg_per_sec.max(0.0) * MDEG) as u32, Ordering::SeqCst);
    }

    /// Override the simulated elevation rate [deg/s].
    pub fn set_el_speed(&self, deg_per_sec: f64) {
        self.el_speed_mdeg_s
            .store((deg_per_sec.max(0.0) * MDEG) as u32, Ordering::SeqCst);
    }

    /// Override the power-OK rail counts.
    pub fn set_power_counts(&self, counts: u16) {
        self.power_counts.store(counts, Ordering::SeqCst);
    }

    /// Force every subsequent conversion to fail.
    pub fn set_adc_fault(&self, fault: bool) {
        self.adc_fault.store(fault, Ordering::SeqCst);
    }

    /// Observed level of one relay line.
    pub fn pin(&self, pin: RelayPin) -> bool {
        self.pins[pin_index(pin)].load(Ordering::SeqCst)
    }

    /// True if any relay line is commanded.
    pub fn any_pin_high(&self) -> bool {
        RelayPin::ALL.iter().any(|&p| self.pin(p))
    }

    fn az_speed(&self) -> f64 {
        f64::from(self.az_speed_mdeg_s.load(Ordering::SeqCst)) / MDEG
    }

    fn el_speed(&self) -> f64 {
        f64::from(self.el_speed_mdeg_s.load(Ordering::SeqCst)) / MDEG
    }
}

const fn pin_index(pin: RelayPin) -> usize {
    match pin {
        RelayPin::AzCw => 0,
        RelayPin::AzCcw => 1,
        RelayPin::ElUp => 2,
        RelayPin::ElDown => 3,
    }
}

/// Software-emulated rotator.
pub struct SimHal {
    mode: SimMode,
    az_counts: f64,
    el_counts: f64,
    controls: Arc<SimControls>,
}

impl SimHal {
    /// New simulator resting at the low limits (park).
    pub fn new(mode: SimMode) -> Self {
        Self {
            mode,
            az_counts: f64::from(SIM_ADC_MIN),
            el_counts: f64::from(SIM_ADC_MIN),
            controls: Arc::new(SimControls::new()),
        }
    }

    /// Clone the override/observation handle.
    pub fn controls(&self) -> Arc<SimControls> {
        Arc::clone(&self.controls)
    }
}

impl RotatorHal for SimHal {
    fn init(&mut self) -> Result<(), HalError> {
        info!(mode = ?self.mode, "simulation driver initialized");
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), HalError> {
        for pin in RelayPin::ALL {
            self.controls.pins[pin_index(pin)].store(false, Ordering::SeqCst);
        }
        info!("simulation driver shut down");
        Ok(())
    }

    fn read_adc(&mut self, channel: AdcChannel) -> Result<u16, HalError> {
        if self.controls.adc_fault.load(Ordering::SeqCst) {
            return Err(HalError::AdcRead("simulated conversion fault".into()));
        }
        let counts = match channel {
            AdcChannel::Az => self.az_counts.round() as u16,
            AdcChannel::El => match self.mode {
                SimMode::AzOnly => SIM_ADC_MIN,
                _ => self.el_counts.round() as u16,
            },
            AdcChannel::Power => self.controls.power_counts.load(Ordering::SeqCst),
        };
        Ok(counts)
    }

    fn set_pin(&mut self, pin: RelayPin, high: bool) -> Result<(), HalError> {
        self.controls.pins[pin_index(pin)].store(high, Ordering::SeqCst);
        Ok(())
    }

    fn advance(&mut self, dt: Duration) {
        let secs = dt.as_secs_f64();
        let span = f64::from(SIM_ADC_MAX - SIM_ADC_MIN);

        let az_dir = match (self.controls.pin(RelayPin::AzCw), self.controls.pin(RelayPin::AzCcw))
        {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        };
        self.az_counts += az_dir * self.controls.az_speed() * span / AZ_RANGE_DEG * secs;
        self.az_counts = self
            .az_counts
            .clamp(f64::from(SIM_ADC_MIN), f64::from(SIM_ADC_MAX));

        let el_range = f64::from(self.mode.el_ceiling_deg());
        if el_range > 0.0 {
            let el_dir = match (
                self.controls.pin(RelayPin::ElUp),
                self.controls.pin(RelayPin::ElDown),
            ) {
                (true, false) => 1.0,
                (false, true) => -1.0,
                _ => 0.0,
            };
            self.el_counts += el_dir * self.controls.el_speed() * span / el_range * secs;
            self.el_counts = self
                .el_counts
                .clamp(f64::from(SIM_ADC_MIN), f64::from(SIM_ADC_MAX));
        }
    }

    fn set_sim_mode(&mut self, mode: SimMode) {
        debug!(?mode, "simulator mode changed");
        self.mode = mode;
        self.az_counts = f64::from(SIM_ADC_MIN);
        self.el_counts = f64::from(SIM_ADC_MIN);
    }
}
