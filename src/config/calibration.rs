use super::ConfigError;
use crate::engine::{FeatureParams, RouterParams, RuleSet, TrainingConfig};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Every calibrated number the calculator depends on.
///
/// Each section falls back to the built-in constants when omitted, so a
/// calibration file only needs to name what it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    pub features: FeatureParams,
    pub router: RouterParams,
    pub rules: RuleSet,
    pub training: TrainingConfig,
}

impl Calibration {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::CalibrationMissing {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::CalibrationIo {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let calibration: Self = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
            ConfigError::CalibrationParse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        calibration.validate()?;
        Ok(calibration)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.features
            .validate()
            .and_then(|_| self.router.validate())
            .and_then(|_| self.rules.validate())
            .and_then(|_| self.training.validate())
            .map_err(ConfigError::InvalidCalibration)
    }
}
