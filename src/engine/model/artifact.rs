use super::super::domain::PathId;
use super::super::features::{FeatureParams, FEATURE_NAMES};
use super::super::router::ReceiptThresholdRouter;
use super::ensemble::{EnsembleParams, TreeEnsemble};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const MODEL_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathModel {
    pub training_cases: usize,
    pub params: EnsembleParams,
    pub ensemble: TreeEnsemble,
}

/// Fitted ensembles plus the feature and routing settings they were trained under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub feature_names: Vec<String>,
    pub outlier_threshold: f64,
    pub feature_params: FeatureParams,
    pub paths: BTreeMap<PathId, PathModel>,
}

impl ModelArtifact {
    pub fn new(
        feature_params: FeatureParams,
        outlier_threshold: f64,
        paths: BTreeMap<PathId, PathModel>,
    ) -> Self {
        Self {
            format_version: MODEL_FORMAT_VERSION,
            feature_names: FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
            outlier_threshold,
            feature_params,
            paths,
        }
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let file = File::open(path).map_err(|source| ModelError::from_io(path, source))?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ModelError> {
        let artifact: Self = serde_json::from_reader(reader)?;
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let file = File::create(path).map_err(|source| ModelError::from_io(path, source))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer
            .flush()
            .map_err(|source| ModelError::from_io(path, source))
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(ModelError::UnsupportedVersion {
                found: self.format_version,
            });
        }
        if !self
            .feature_names
            .iter()
            .map(String::as_str)
            .eq(FEATURE_NAMES.iter().copied())
        {
            return Err(ModelError::FeatureSchema {
                found: self.feature_names.clone(),
            });
        }
        if !self.outlier_threshold.is_finite() {
            return Err(ModelError::Invalid(
                "outlier_threshold must be finite".to_string(),
            ));
        }
        self.feature_params.validate().map_err(ModelError::Invalid)?;
        for path in PathId::ordered() {
            let model = self.paths.get(&path).ok_or(ModelError::MissingPath(path))?;
            model
                .ensemble
                .validate()
                .map_err(|reason| ModelError::Invalid(format!("{path} ensemble: {reason}")))?;
        }
        Ok(())
    }

    pub fn ensemble(&self, path: PathId) -> Option<&TreeEnsemble> {
        self.paths.get(&path).map(|model| &model.ensemble)
    }

    pub fn router(&self) -> ReceiptThresholdRouter {
        ReceiptThresholdRouter::new(self.outlier_threshold)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model artifact not found at {}", path.display())]
    Missing { path: PathBuf },
    #[error("failed to access model artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model artifact is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported model format version {found} (expected {MODEL_FORMAT_VERSION})")]
    UnsupportedVersion { found: u32 },
    #[error("model was trained on a different feature schema: {found:?}")]
    FeatureSchema { found: Vec<String> },
    #[error("model artifact has no ensemble for the {0} path")]
    MissingPath(PathId),
    #[error("invalid model artifact: {0}")]
    Invalid(String),
}

impl ModelError {
    fn from_io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::Missing {
                path: path.to_path_buf(),
            }
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}
