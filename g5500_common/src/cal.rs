//! Calibration endpoints, file persistence and degree↔count conversion.
//!
//! The calibration is four 12-bit ADC counts marking the mechanical
//! endpoints of each axis, found by sweeping against the limit switches.
//! It persists as a plain `key = value` text file under `$HOME` so an
//! operator can inspect or hand-edit it.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::consts::{ADC_MAX, CAL_FILE_NAME, CAL_MIN_SPAN, SIM_ADC_MAX, SIM_ADC_MIN};
use crate::error::CalError;

const KEY_AZ_MIN: &str = "ADC_az_min";
const KEY_AZ_MAX: &str = "ADC_az_max";
const KEY_EL_MIN: &str = "ADC_el_min";
const KEY_EL_MAX: &str = "ADC_el_max";

/// ADC counts at the four mechanical endpoints.
///
/// A `Calibration` value in hand is always span-valid; construction from a
/// file or sweep rejects endpoints closer than [`CAL_MIN_SPAN`] counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    /// Azimuth counts at the counter-clockwise limit.
    pub az_min: u16,
    /// Azimuth counts at the clockwise limit.
    pub az_max: u16,
    /// Elevation counts at the horizon limit.
    pub el_min: u16,
    /// Elevation counts at the upper limit.
    pub el_max: u16,
}

impl Calibration {
    /// Validate the span invariant on both axes.
    pub fn validate(&self) -> Result<(), CalError> {
        if self.az_max < self.az_min.saturating_add(CAL_MIN_SPAN) {
            return Err(CalError::SpanTooSmall {
                axis: "az",
                min: self.az_min,
                max: self.az_max,
            });
        }
        if self.el_max < self.el_min.saturating_add(CAL_MIN_SPAN) {
            return Err(CalError::SpanTooSmall {
                axis: "el",
                min: self.el_min,
                max: self.el_max,
            });
        }
        Ok(())
    }

    /// Fixed endpoints synthesized when a simulator mode is selected.
    pub const fn synthetic() -> Self {
        Self {
            az_min: SIM_ADC_MIN,
            az_max: SIM_ADC_MAX,
            el_min: SIM_ADC_MIN,
            el_max: SIM_ADC_MAX,
        }
    }
}

/// Load/save handle for the calibration file.
#[derive(Debug, Clone)]
pub struct CalStore {
    path: PathBuf,
}

impl CalStore {
    /// Store backed by an explicit path (tests, `--cal-file`).
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Default store under `$HOME`, falling back to the working directory.
    pub fn default_path() -> Self {
        let home = std::env::var_os("HOME").map_or_else(|| PathBuf::from("."), PathBuf::from);
        Self {
            path: home.join(CAL_FILE_NAME),
        }
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and validate the calibration file.
    ///
    /// Keys may appear in any order; unrecognized lines are ignored. Any
    /// missing key, unparsable value or span violation fails the load; the
    /// caller treats every failure as "not calibrated".
    pub fn load(&self) -> Result<Calibration, CalError> {
        let text = fs::read_to_string(&self.path)?;

        let mut az_min = None;
        let mut az_max = None;
        let mut el_min = None;
        let mut el_max = None;

        for line in text.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let slot = match key.trim() {
                KEY_AZ_MIN => &mut az_min,
                KEY_AZ_MAX => &mut az_max,
                KEY_EL_MIN => &mut el_min,
                KEY_EL_MAX => &mut el_max,
                _ => continue,
            };
            *slot = Some(value.trim().to_string());
        }

        let cal = Calibration {
            az_min: parse_counts(KEY_AZ_MIN, az_min)?,
            az_max: parse_counts(KEY_AZ_MAX, az_max)?,
            el_min: parse_counts(KEY_EL_MIN, el_min)?,
            el_max: parse_counts(KEY_EL_MAX, el_max)?,
        };
        cal.validate()?;

        debug!(path = %self.path.display(), ?cal, "calibration loaded");
        Ok(cal)
    }

    /// Truncate-and-write the calibration file.
    pub fn save(&self, cal: &Calibration) -> Result<(), CalError> {
        let text = format!(
            "{KEY_AZ_MIN} = {}\n{KEY_AZ_MAX} = {}\n{KEY_EL_MIN} = {}\n{KEY_EL_MAX} = {}\n",
            cal.az_min, cal.az_max, cal.el_min, cal.el_max
        );
        fs::write(&self.path, text)?;
        info!(path = %self.path.display(), "calibration saved");
        Ok(())
    }
}

fn parse_counts(key: &'static str, value: Option<String>) -> Result<u16, CalError> {
    let raw = value.ok_or(CalError::MissingKey(key))?;
    let counts: u16 = raw.parse().map_err(|_| CalError::BadValue {
        key,
        value: raw.clone(),
    })?;
    if counts > ADC_MAX {
        return Err(CalError::BadValue { key, value: raw });
    }
    Ok(counts)
}

/// Pure linear maps between world degrees and ADC counts.
///
/// Only meaningful with a valid calibration; both directions clamp to the
/// mount bounds. Elevation takes the effective ceiling in degrees, which
/// tracks the simulator mode (0 in azimuth-only mode).
pub mod convert {
    use super::Calibration;
    use crate::consts::AZ_RANGE_DEG;

    /// Azimuth degrees to target counts.
    pub fn az_to_adc(deg: f64, cal: &Calibration) -> u16 {
        let deg = deg.clamp(0.0, AZ_RANGE_DEG);
        let span = f64::from(cal.az_max - cal.az_min);
        let counts = f64::from(cal.az_min) + deg * span / AZ_RANGE_DEG;
        (counts.round() as u16).clamp(cal.az_min, cal.az_max)
    }

    /// Azimuth counts to degrees.
    pub fn adc_to_az(counts: u16, cal: &Calibration) -> f64 {
        let counts = counts.clamp(cal.az_min, cal.az_max);
        let span = f64::from(cal.az_max - cal.az_min);
        f64::from(counts - cal.az_min) * AZ_RANGE_DEG / span
    }

    /// Elevation degrees to target counts under the given ceiling.
    pub fn el_to_adc(deg: f64, cal: &Calibration, el_ceiling_deg: u16) -> u16 {
        if el_ceiling_deg == 0 {
            return cal.el_min;
        }
        let ceiling = f64::from(el_ceiling_deg);
        let deg = deg.clamp(0.0, ceiling);
        let span = f64::from(cal.el_max - cal.el_min);
        let counts = f64::from(cal.el_min) + deg * span / ceiling;
        (counts.round() as u16).clamp(cal.el_min, cal.el_max)
    }

    /// Elevation counts to degrees under the given ceiling.
    pub fn adc_to_el(counts: u16, cal: &Calibration, el_ceiling_deg: u16) -> f64 {
        if el_ceiling_deg == 0 {
            return 0.0;
        }
        let counts = counts.clamp(cal.el_min, cal.el_max);
        let span = f64::from(cal.el_max - cal.el_min);
        f64::from(counts - cal.el_min) * f64::from(el_ceiling_deg) / span
    }
}
