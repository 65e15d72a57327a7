mod calibration;

pub use calibration::Calibration;

use clap::ValueEnum;
use std::env;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_MODEL_PATH: &str = "reimbursement_model.json";

/// Distinguishes runtime behavior for different stages of the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Production => "production",
        }
    }
}

/// Which prediction strategy backs the calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyKind {
    /// Hand-calibrated formula with per-path rule tables
    Rules,
    /// Seeded tree ensembles loaded from a model artifact
    Learned,
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("REIMBURSE_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let log_level = env::var("REIMBURSE_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());

        let strategy = match env::var("REIMBURSE_STRATEGY") {
            Ok(value) => StrategyKind::from_str(value.trim(), true)
                .map_err(|_| ConfigError::InvalidStrategy { value })?,
            Err(_) => StrategyKind::Rules,
        };

        let model_path = env::var("REIMBURSE_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL_PATH));

        let calibration_path = env::var("REIMBURSE_CALIBRATION_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let chunk_size = match env::var("REIMBURSE_CHUNK_SIZE") {
            Ok(value) => value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or(ConfigError::InvalidChunkSize { value })?,
            Err(_) => crate::harness::DEFAULT_CHUNK_SIZE,
        };

        let top_k = match env::var("REIMBURSE_TOP_K") {
            Ok(value) => value
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidTopK { value })?,
            Err(_) => crate::harness::DEFAULT_TOP_K,
        };

        Ok(Self {
            environment,
            telemetry: TelemetryConfig { log_level },
            engine: EngineConfig {
                strategy,
                model_path,
                calibration_path,
                chunk_size,
                top_k,
            },
        })
    }
}

/// Logging controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Settings for building the calculator and running datasets through it.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub strategy: StrategyKind,
    pub model_path: PathBuf,
    pub calibration_path: Option<PathBuf>,
    pub chunk_size: usize,
    pub top_k: usize,
}

impl EngineConfig {
    /// Loads the calibration file when one is configured, otherwise the built-in constants.
    pub fn calibration(&self) -> Result<Calibration, ConfigError> {
        match &self.calibration_path {
            Some(path) => Calibration::from_path(path),
            None => Ok(Calibration::default()),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidStrategy {
        value: String,
    },
    InvalidChunkSize {
        value: String,
    },
    InvalidTopK {
        value: String,
    },
    CalibrationMissing {
        path: PathBuf,
    },
    CalibrationIo {
        path: PathBuf,
        source: std::io::Error,
    },
    CalibrationParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    InvalidCalibration(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidStrategy { value } => {
                write!(f, "REIMBURSE_STRATEGY must be 'rules' or 'learned', got '{value}'")
            }
            ConfigError::InvalidChunkSize { value } => {
                write!(f, "REIMBURSE_CHUNK_SIZE must be a positive integer, got '{value}'")
            }
            ConfigError::InvalidTopK { value } => {
                write!(f, "REIMBURSE_TOP_K must be a non-negative integer, got '{value}'")
            }
            ConfigError::CalibrationMissing { path } => {
                write!(f, "calibration file not found at {}", path.display())
            }
            ConfigError::CalibrationIo { path, .. } => {
                write!(f, "unable to read calibration file {}", path.display())
            }
            ConfigError::CalibrationParse { path, source } => {
                write!(f, "calibration file {} is invalid: {source}", path.display())
            }
            ConfigError::InvalidCalibration(reason) => write!(f, "invalid calibration: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::CalibrationIo { source, .. } => Some(source),
            ConfigError::CalibrationParse { source, .. } => Some(source),
            ConfigError::InvalidStrategy { .. }
            | ConfigError::InvalidChunkSize { .. }
            | ConfigError::InvalidTopK { .. }
            | ConfigError::CalibrationMissing { .. }
            | ConfigError::InvalidCalibration(_) => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    pub(crate) fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("REIMBURSE_ENV");
        env::remove_var("REIMBURSE_LOG_LEVEL");
        env::remove_var("REIMBURSE_STRATEGY");
        env::remove_var("REIMBURSE_MODEL_PATH");
        env::remove_var("REIMBURSE_CALIBRATION_PATH");
        env::remove_var("REIMBURSE_CHUNK_SIZE");
        env::remove_var("REIMBURSE_TOP_K");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.telemetry.log_level, "warn");
        assert_eq!(config.engine.strategy, StrategyKind::Rules);
        assert_eq!(config.engine.model_path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert_eq!(config.engine.calibration_path, None);
        assert_eq!(config.engine.chunk_size, 100);
        assert_eq!(config.engine.top_k, 5);
    }

    #[test]
    fn reads_overrides_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("REIMBURSE_ENV", "ci");
        env::set_var("REIMBURSE_STRATEGY", "Learned");
        env::set_var("REIMBURSE_MODEL_PATH", "models/latest.json");
        env::set_var("REIMBURSE_CHUNK_SIZE", "25");
        env::set_var("REIMBURSE_TOP_K", "0");
        let config = AppConfig::load().expect("config loads");
        reset_env();

        assert_eq!(config.environment, AppEnvironment::Test);
        assert_eq!(config.environment.as_str(), "test");
        assert_eq!(config.engine.strategy, StrategyKind::Learned);
        assert_eq!(config.engine.model_path, PathBuf::from("models/latest.json"));
        assert_eq!(config.engine.chunk_size, 25);
        assert_eq!(config.engine.top_k, 0);
    }

    #[test]
    fn environment_aliases_normalize_to_stage_names() {
        assert_eq!(AppEnvironment::from_str(" PROD ").as_str(), "production");
        assert_eq!(AppEnvironment::from_str("staging").as_str(), "development");
        assert_eq!(AppEnvironment::from_str("ci"), AppEnvironment::Test);
    }

    #[test]
    fn rejects_zero_chunk_size() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("REIMBURSE_CHUNK_SIZE", "0");
        let result = AppConfig::load();
        reset_env();
        assert!(matches!(result, Err(ConfigError::InvalidChunkSize { .. })));
    }

    #[test]
    fn rejects_unknown_strategy() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("REIMBURSE_STRATEGY", "neural");
        let result = AppConfig::load();
        reset_env();
        let err = result.expect_err("unknown strategy");
        assert!(err.to_string().contains("neural"));
    }
}
