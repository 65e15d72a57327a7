use super::super::features::FeatureVector;
use super::tree::{RegressionTree, TreeParams};
use super::TrainingError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Hyperparameters shared by every member of an ensemble; members differ only by seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleParams {
    pub tree: TreeParams,
    pub seeds: Vec<u64>,
}

impl EnsembleParams {
    pub fn validate(&self) -> Result<(), String> {
        self.tree.validate()?;
        if self.seeds.is_empty() {
            return Err("an ensemble needs at least one seed".to_string());
        }
        Ok(())
    }
}

/// Average of independently seeded regression trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    members: Vec<RegressionTree>,
}

impl TreeEnsemble {
    pub fn fit(
        samples: &[FeatureVector],
        targets: &[f64],
        params: &EnsembleParams,
    ) -> Result<Self, TrainingError> {
        params.validate().map_err(TrainingError::InvalidParams)?;

        let members = params
            .seeds
            .par_iter()
            .map(|&seed| RegressionTree::fit(samples, targets, &params.tree, seed))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { members })
    }

    pub fn predict(&self, features: &FeatureVector) -> f64 {
        let total: f64 = self
            .members
            .iter()
            .map(|tree| tree.predict(features))
            .sum();
        total / self.members.len() as f64
    }

    pub fn members(&self) -> &[RegressionTree] {
        &self.members
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.members.is_empty() {
            return Err("ensemble has no members".to_string());
        }
        self.members.iter().try_for_each(RegressionTree::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::features::FEATURE_COUNT;

    fn row(value: f64) -> FeatureVector {
        let mut vector = [0.0; FEATURE_COUNT];
        vector[3] = value;
        vector
    }

    fn params(seeds: Vec<u64>) -> EnsembleParams {
        EnsembleParams {
            tree: TreeParams {
                max_depth: 3,
                min_samples_leaf: 1,
            },
            seeds,
        }
    }

    #[test]
    fn keeps_seed_order_and_averages_members() {
        let samples: Vec<_> = (0..12).map(|i| row(f64::from(i))).collect();
        let targets: Vec<_> = (0..12).map(|i| f64::from(i) * 2.0).collect();

        let ensemble = TreeEnsemble::fit(&samples, &targets, &params(vec![42, 123, 456]))
            .expect("ensemble fits");
        let seeds: Vec<_> = ensemble.members().iter().map(RegressionTree::seed).collect();
        assert_eq!(seeds, vec![42, 123, 456]);

        let query = row(5.0);
        let expected = ensemble
            .members()
            .iter()
            .map(|tree| tree.predict(&query))
            .sum::<f64>()
            / 3.0;
        assert_eq!(ensemble.predict(&query), expected);
    }

    #[test]
    fn requires_at_least_one_seed() {
        let samples = vec![row(1.0)];
        let error = TreeEnsemble::fit(&samples, &[1.0], &params(Vec::new()))
            .expect_err("no seeds rejected");
        assert!(matches!(error, TrainingError::InvalidParams(_)));
    }
}
