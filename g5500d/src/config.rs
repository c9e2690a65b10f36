//! Daemon configuration: TOML file with CLI overrides.
//!
//! Every field has a default, so a missing file (when none was named on
//! the command line) runs the daemon with stock ports on real hardware.

use std::path::{Path, PathBuf};

use g5500_common::consts::{DEFAULT_DIRECT_PORT, DEFAULT_ROTCTLD_PORT};
use serde::Deserialize;
use thiserror::Error;

/// Configuration load/validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File named on the command line could not be read.
    #[error("config read {path}: {source}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// TOML syntax or type error.
    #[error("config parse: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is outside its allowed range.
    #[error("config invalid: {0}")]
    Invalid(String),
}

/// Daemon settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    /// Simulator mode `{0..3}`; 0 runs the real hardware driver.
    pub simulator: u8,
    /// Listen port for the rotctld-compatible dialect.
    pub rotctld_port: u16,
    /// Listen port for the permissive direct dialect.
    pub direct_port: u16,
    /// Calibration file override; defaults to `$HOME/.hamlib_g5500_cal.txt`.
    pub cal_file: Option<PathBuf>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            simulator: 0,
            rotctld_port: DEFAULT_ROTCTLD_PORT,
            direct_port: DEFAULT_DIRECT_PORT,
            cal_file: None,
        }
    }
}

impl DaemonConfig {
    /// Load from an explicit path, or defaults when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            None => Self::default(),
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                toml::from_str(&text)?
            }
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.simulator > 3 {
            return Err(ConfigError::Invalid(format!(
                "simulator must be 0..=3, got {}",
                self.simulator
            )));
        }
        if self.rotctld_port == self.direct_port {
            return Err(ConfigError::Invalid(format!(
                "rotctld_port and direct_port must differ (both {})",
                self.rotctld_port
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn defaults_without_a_file() {
        let config = DaemonConfig::load(None).unwrap();
        assert_eq!(config.simulator, 0);
        assert_eq!(config.rotctld_port, 4533);
        assert_eq!(config.direct_port, 8880);
        assert_eq!(config.cal_file, None);
    }

    #[test]
    fn parses_a_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("g5500d.toml");
        fs::write(&path, "simulator = 3\nrotctld_port = 4534\n").unwrap();
        let config = DaemonConfig::load(Some(&path)).unwrap();
        assert_eq!(config.simulator, 3);
        assert_eq!(config.rotctld_port, 4534);
        assert_eq!(config.direct_port, 8880);
    }

    #[test]
    fn rejects_out_of_range_simulator() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("g5500d.toml");
        fs::write(&path, "simulator = 7\n").unwrap();
        assert!(matches!(
            DaemonConfig::load(Some(&path)),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_colliding_ports() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("g5500d.toml");
        fs::write(&path, "rotctld_port = 5000\ndirect_port = 5000\n").unwrap();
        assert!(matches!(
            DaemonConfig::load(Some(&path)),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_unknown_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("g5500d.toml");
        fs::write(&path, "simulatr = 1\n").unwrap();
        assert!(matches!(
            DaemonConfig::load(Some(&path)),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_named_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            DaemonConfig::load(Some(&dir.path().join("nope.toml"))),
            Err(ConfigError::Io { .. })
        ));
    }
}
