use super::super::domain::PathId;
use super::super::features::DerivedFeatures;
use super::super::model::ModelArtifact;
use super::{ComputationError, PredictionStrategy};
use std::sync::Arc;

/// Predicts with the fitted ensemble of the routed path.
///
/// The artifact is loaded once and shared read-only for the life of the process.
#[derive(Debug, Clone)]
pub struct LearnedStrategy {
    artifact: Arc<ModelArtifact>,
}

impl LearnedStrategy {
    pub fn new(artifact: ModelArtifact) -> Self {
        Self {
            artifact: Arc::new(artifact),
        }
    }
}

impl PredictionStrategy for LearnedStrategy {
    fn name(&self) -> &'static str {
        "learned"
    }

    fn predict(&self, path: PathId, features: &DerivedFeatures) -> Result<f64, ComputationError> {
        let ensemble = self
            .artifact
            .ensemble(path)
            .ok_or(ComputationError::MissingPathModel(path))?;
        Ok(ensemble.predict(&features.to_vector()))
    }
}
