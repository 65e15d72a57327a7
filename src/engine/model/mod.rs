//! Learned-function models: CART regression trees, seeded ensembles, and the
//! JSON artifact that carries one fitted ensemble per prediction path.

mod artifact;
mod ensemble;
mod tree;

pub use artifact::{ModelArtifact, ModelError, PathModel, MODEL_FORMAT_VERSION};
pub use ensemble::{EnsembleParams, TreeEnsemble};
pub use tree::{RegressionTree, TreeNode, TreeParams};

use super::domain::{PathId, TripRecord};
use super::features::{derive, FeatureParams, FeatureVector};
use super::router::{ReceiptThresholdRouter, Route};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const DEFAULT_SEEDS: [u64; 5] = [42, 123, 456, 789, 999];

/// Per-path ensemble hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub main: EnsembleParams,
    pub outlier: EnsembleParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            main: EnsembleParams {
                tree: TreeParams {
                    max_depth: 12,
                    min_samples_leaf: 3,
                },
                seeds: DEFAULT_SEEDS.to_vec(),
            },
            outlier: EnsembleParams {
                tree: TreeParams {
                    max_depth: 8,
                    min_samples_leaf: 2,
                },
                seeds: DEFAULT_SEEDS.to_vec(),
            },
        }
    }
}

impl TrainingConfig {
    pub fn for_path(&self, path: PathId) -> &EnsembleParams {
        match path {
            PathId::Main => &self.main,
            PathId::Outlier => &self.outlier,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        PathId::ordered().into_iter().try_for_each(|path| {
            self.for_path(path)
                .validate()
                .map_err(|reason| format!("training.{path}: {reason}"))
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("no training cases were routed to the {0} path")]
    EmptyPath(PathId),
    #[error("cannot fit a tree without samples")]
    NoSamples,
    #[error("{samples} samples but {targets} targets")]
    ShapeMismatch { samples: usize, targets: usize },
    #[error("invalid training parameters: {0}")]
    InvalidParams(String),
}

/// Fits one ensemble per path, partitioning examples with the same router used at prediction time.
pub fn train(
    examples: &[(TripRecord, f64)],
    features: &FeatureParams,
    router: &ReceiptThresholdRouter,
    config: &TrainingConfig,
) -> Result<ModelArtifact, TrainingError> {
    config.validate().map_err(TrainingError::InvalidParams)?;

    let mut partitions: BTreeMap<PathId, (Vec<FeatureVector>, Vec<f64>)> = BTreeMap::new();
    for (record, expected) in examples {
        let (samples, targets) = partitions.entry(router.route(record)).or_default();
        samples.push(derive(record, features).to_vector());
        targets.push(*expected);
    }

    let mut paths = BTreeMap::new();
    for path in PathId::ordered() {
        let (samples, targets) = partitions
            .remove(&path)
            .ok_or(TrainingError::EmptyPath(path))?;
        let params = config.for_path(path);

        info!(
            %path,
            cases = samples.len(),
            members = params.seeds.len(),
            max_depth = params.tree.max_depth,
            "fitting path ensemble"
        );
        let ensemble = TreeEnsemble::fit(&samples, &targets, params)?;
        for tree in ensemble.members() {
            debug!(
                %path,
                seed = tree.seed(),
                depth = tree.depth(),
                leaves = tree.leaf_count(),
                "fitted tree"
            );
        }

        paths.insert(
            path,
            PathModel {
                training_cases: samples.len(),
                params: params.clone(),
                ensemble,
            },
        );
    }

    Ok(ModelArtifact::new(
        features.clone(),
        router.outlier_threshold(),
        paths,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(days: u32, miles: f64, receipts: f64, expected: f64) -> (TripRecord, f64) {
        (
            TripRecord::new(days, miles, receipts).expect("valid record"),
            expected,
        )
    }

    fn small_config() -> TrainingConfig {
        let params = EnsembleParams {
            tree: TreeParams {
                max_depth: 4,
                min_samples_leaf: 1,
            },
            seeds: vec![42, 123],
        };
        TrainingConfig {
            main: params.clone(),
            outlier: params,
        }
    }

    #[test]
    fn partitions_examples_by_route() {
        let examples = vec![
            example(1, 50.0, 10.0, 120.0),
            example(3, 150.0, 200.0, 480.0),
            example(5, 300.0, 900.0, 1100.0),
            example(4, 200.0, 1800.0, 1400.0),
            example(8, 900.0, 2200.0, 1650.0),
        ];
        let artifact = train(
            &examples,
            &FeatureParams::default(),
            &ReceiptThresholdRouter::default(),
            &small_config(),
        )
        .expect("training succeeds");

        assert_eq!(artifact.paths[&PathId::Main].training_cases, 3);
        assert_eq!(artifact.paths[&PathId::Outlier].training_cases, 2);
        assert_eq!(artifact.outlier_threshold, 1400.0);
        assert!(artifact.validate().is_ok());
    }

    #[test]
    fn empty_path_is_reported() {
        let examples = vec![example(1, 50.0, 10.0, 120.0), example(2, 80.0, 30.0, 250.0)];
        let error = train(
            &examples,
            &FeatureParams::default(),
            &ReceiptThresholdRouter::default(),
            &small_config(),
        )
        .expect_err("outlier path has no cases");
        assert!(matches!(error, TrainingError::EmptyPath(PathId::Outlier)));
    }

    #[test]
    fn default_config_mirrors_reference_hyperparameters() {
        let config = TrainingConfig::default();
        assert_eq!(config.main.tree.max_depth, 12);
        assert_eq!(config.main.tree.min_samples_leaf, 3);
        assert_eq!(config.outlier.tree.max_depth, 8);
        assert_eq!(config.outlier.tree.min_samples_leaf, 2);
        assert_eq!(config.main.seeds, DEFAULT_SEEDS.to_vec());
        assert!(config.validate().is_ok());
    }
}
