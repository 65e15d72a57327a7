use crate::config::ConfigError;
use crate::engine::{ComputationError, InvalidInput, ModelError, TrainingError};
use crate::harness::DatasetError;
use crate::telemetry::TelemetryError;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Dataset(DatasetError),
    Model(ModelError),
    Training(TrainingError),
    InvalidInput(InvalidInput),
    Computation(ComputationError),
    MissingResource {
        resource: &'static str,
        path: PathBuf,
    },
    BatchFailures {
        failed: usize,
        total: usize,
    },
    NoPredictions {
        total: usize,
    },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Dataset(err) => write!(f, "dataset error: {}", err),
            AppError::Model(err) => write!(f, "model error: {}", err),
            AppError::Training(err) => write!(f, "training error: {}", err),
            AppError::InvalidInput(err) => write!(f, "invalid input: {}", err),
            AppError::Computation(err) => write!(f, "computation error: {}", err),
            AppError::MissingResource { resource, path } => {
                write!(f, "missing {}: {} does not exist", resource, path.display())
            }
            AppError::BatchFailures { failed, total } => {
                write!(f, "{} of {} records failed", failed, total)
            }
            AppError::NoPredictions { total } => {
                write!(f, "none of {} cases produced a prediction", total)
            }
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Dataset(err) => Some(err),
            AppError::Model(err) => Some(err),
            AppError::Training(err) => Some(err),
            AppError::InvalidInput(err) => Some(err),
            AppError::Computation(err) => Some(err),
            AppError::MissingResource { .. }
            | AppError::BatchFailures { .. }
            | AppError::NoPredictions { .. } => None,
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        match value {
            ConfigError::CalibrationMissing { path } => Self::MissingResource {
                resource: "calibration file",
                path,
            },
            other => Self::Config(other),
        }
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<DatasetError> for AppError {
    fn from(value: DatasetError) -> Self {
        match value {
            DatasetError::Missing { path } => Self::MissingResource {
                resource: "dataset",
                path,
            },
            other => Self::Dataset(other),
        }
    }
}

impl From<ModelError> for AppError {
    fn from(value: ModelError) -> Self {
        match value {
            ModelError::Missing { path } => Self::MissingResource {
                resource: "model artifact",
                path,
            },
            other => Self::Model(other),
        }
    }
}

impl From<TrainingError> for AppError {
    fn from(value: TrainingError) -> Self {
        Self::Training(value)
    }
}

impl From<InvalidInput> for AppError {
    fn from(value: InvalidInput) -> Self {
        Self::InvalidInput(value)
    }
}

impl From<ComputationError> for AppError {
    fn from(value: ComputationError) -> Self {
        Self::Computation(value)
    }
}
