mod learned;
mod rules;

pub use learned::LearnedStrategy;
pub use rules::{
    CategoryAdjustments, ReimbursementBreakdown, RuleBasedStrategy, RuleParams, RuleSet,
};

use super::domain::PathId;
use super::features::DerivedFeatures;

/// A way of turning derived features into an unrounded reimbursement amount.
///
/// The calculator hands every strategy the path chosen by its router, so a
/// strategy keeps one calibrated function per [`PathId`].
pub trait PredictionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn predict(&self, path: PathId, features: &DerivedFeatures) -> Result<f64, ComputationError>;
}

impl<S: PredictionStrategy + ?Sized> PredictionStrategy for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn predict(&self, path: PathId, features: &DerivedFeatures) -> Result<f64, ComputationError> {
        (**self).predict(path, features)
    }
}

/// Unexpected failure while producing a prediction for a valid record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComputationError {
    #[error("no fitted model is available for the {0} path")]
    MissingPathModel(PathId),
    #[error("{strategy} strategy produced a non-finite amount ({value}) on the {path} path")]
    NonFinite {
        strategy: &'static str,
        path: PathId,
        value: f64,
    },
}
