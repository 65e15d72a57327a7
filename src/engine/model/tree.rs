use super::super::features::{FeatureVector, FEATURE_COUNT};
use super::TrainingError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Smallest squared-error reduction that justifies a split.
const MIN_IMPROVEMENT: f64 = 1e-9;

/// Growth limits for a single regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
}

impl TreeParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_samples_leaf == 0 {
            return Err("min_samples_leaf must be at least 1".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    Leaf {
        value: f64,
        samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// CART regression tree stored as a flat node list, root first.
///
/// Samples with `x[feature] <= threshold` descend left. Children always sit at
/// higher indices than their parent, which [`RegressionTree::validate`] checks
/// for trees read back from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    seed: u64,
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    pub fn fit(
        samples: &[FeatureVector],
        targets: &[f64],
        params: &TreeParams,
        seed: u64,
    ) -> Result<Self, TrainingError> {
        params.validate().map_err(TrainingError::InvalidParams)?;
        if samples.len() != targets.len() {
            return Err(TrainingError::ShapeMismatch {
                samples: samples.len(),
                targets: targets.len(),
            });
        }
        if samples.is_empty() {
            return Err(TrainingError::NoSamples);
        }

        let mut builder = TreeBuilder {
            samples,
            targets,
            params,
            rng: StdRng::seed_from_u64(seed),
            nodes: Vec::new(),
        };
        let mut indices: Vec<usize> = (0..samples.len()).collect();
        builder.grow(&mut indices, 0);

        Ok(Self {
            seed,
            nodes: builder.nodes,
        })
    }

    pub fn predict(&self, features: &FeatureVector) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, TreeNode::Leaf { .. }))
            .count()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], index: usize) -> usize {
            match &nodes[index] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
            }
        }
        walk(&self.nodes, 0)
    }

    /// Structural checks for trees loaded from an artifact. `predict` relies on them.
    pub fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Leaf { value, .. } if !value.is_finite() => {
                    return Err(format!("leaf {index} holds a non-finite value"));
                }
                TreeNode::Leaf { .. } => {}
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= FEATURE_COUNT {
                        return Err(format!("node {index} splits on unknown feature {feature}"));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {index} has a NaN threshold"));
                    }
                    let in_bounds = |child: usize| child > index && child < self.nodes.len();
                    if !in_bounds(*left) || !in_bounds(*right) {
                        return Err(format!("node {index} points at an invalid child"));
                    }
                }
            }
        }
        Ok(())
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    improvement: f64,
}

struct TreeBuilder<'a> {
    samples: &'a [FeatureVector],
    targets: &'a [f64],
    params: &'a TreeParams,
    rng: StdRng,
    nodes: Vec<TreeNode>,
}

impl TreeBuilder<'_> {
    fn grow(&mut self, indices: &mut [usize], depth: usize) -> usize {
        let id = self.nodes.len();
        let count = indices.len();
        let sum: f64 = indices.iter().map(|&i| self.targets[i]).sum();
        self.nodes.push(TreeNode::Leaf {
            value: sum / count as f64,
            samples: count,
        });

        if depth >= self.params.max_depth
            || count < 2 * self.params.min_samples_leaf
            || self.is_pure(indices)
        {
            return id;
        }

        let Some(split) = self.best_split(indices, sum) else {
            return id;
        };

        let (left_part, right_part): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.samples[i][split.feature] <= split.threshold);
        let mid = left_part.len();
        indices[..mid].copy_from_slice(&left_part);
        indices[mid..].copy_from_slice(&right_part);

        let (left_indices, right_indices) = indices.split_at_mut(mid);
        let left = self.grow(left_indices, depth + 1);
        let right = self.grow(right_indices, depth + 1);

        self.nodes[id] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    fn is_pure(&self, indices: &[usize]) -> bool {
        let first = self.targets[indices[0]];
        indices.iter().all(|&i| self.targets[i] == first)
    }

    /// Scans features in a seeded order; later features only win on a strictly larger gain.
    fn best_split(&mut self, indices: &[usize], total: f64) -> Option<SplitCandidate> {
        let count = indices.len();
        let min_leaf = self.params.min_samples_leaf;
        let parent_proxy = total * total / count as f64;

        let mut features: Vec<usize> = (0..FEATURE_COUNT).collect();
        features.shuffle(&mut self.rng);

        let mut best: Option<SplitCandidate> = None;
        let mut sorted = indices.to_vec();

        for feature in features {
            sorted.sort_by(|&a, &b| self.samples[a][feature].total_cmp(&self.samples[b][feature]));

            let mut left_sum = 0.0;
            for position in 0..count - 1 {
                left_sum += self.targets[sorted[position]];
                let left_count = position + 1;
                let right_count = count - left_count;
                if left_count < min_leaf {
                    continue;
                }
                if right_count < min_leaf {
                    break;
                }

                let current = self.samples[sorted[position]][feature];
                let next = self.samples[sorted[position + 1]][feature];
                if next <= current {
                    continue;
                }

                let right_sum = total - left_sum;
                let improvement = left_sum * left_sum / left_count as f64
                    + right_sum * right_sum / right_count as f64
                    - parent_proxy;
                let best_so_far = best
                    .as_ref()
                    .map_or(MIN_IMPROVEMENT, |candidate| candidate.improvement);
                if improvement > best_so_far {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: midpoint(current, next),
                        improvement,
                    });
                }
            }
        }

        best
    }
}

fn midpoint(low: f64, high: f64) -> f64 {
    let mid = low + (high - low) / 2.0;
    if mid >= high {
        low
    } else {
        mid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(first: f64, second: f64) -> FeatureVector {
        let mut vector = [0.0; FEATURE_COUNT];
        vector[0] = first;
        vector[1] = second;
        vector
    }

    fn params(max_depth: usize, min_samples_leaf: usize) -> TreeParams {
        TreeParams {
            max_depth,
            min_samples_leaf,
        }
    }

    #[test]
    fn fits_a_step_function_exactly() {
        let samples: Vec<_> = (0..10).map(|i| row(f64::from(i), 0.0)).collect();
        let targets: Vec<_> = (0..10).map(|i| if i < 5 { 100.0 } else { 300.0 }).collect();

        let tree = RegressionTree::fit(&samples, &targets, &params(4, 1), 42).expect("fits");
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.leaf_count(), 2);
        assert_eq!(tree.predict(&row(2.0, 0.0)), 100.0);
        assert_eq!(tree.predict(&row(7.0, 0.0)), 300.0);
        match &tree.nodes()[0] {
            TreeNode::Split {
                feature, threshold, ..
            } => {
                assert_eq!(*feature, 0);
                assert_eq!(*threshold, 4.5);
            }
            other => panic!("expected root split, got {other:?}"),
        }
    }

    #[test]
    fn respects_max_depth_and_min_samples_leaf() {
        let samples: Vec<_> = (0..32).map(|i| row(f64::from(i), 0.0)).collect();
        let targets: Vec<_> = (0..32).map(|i| f64::from(i * i)).collect();

        let shallow = RegressionTree::fit(&samples, &targets, &params(2, 1), 7).expect("fits");
        assert!(shallow.depth() <= 2);

        let coarse = RegressionTree::fit(&samples, &targets, &params(20, 8), 7).expect("fits");
        for node in coarse.nodes() {
            if let TreeNode::Leaf { samples, .. } = node {
                assert!(*samples >= 8);
            }
        }
    }

    #[test]
    fn zero_depth_predicts_the_mean() {
        let samples = vec![row(1.0, 0.0), row(2.0, 0.0), row(3.0, 0.0)];
        let targets = vec![10.0, 20.0, 60.0];
        let tree = RegressionTree::fit(&samples, &targets, &params(0, 1), 1).expect("fits");
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.predict(&row(100.0, 0.0)), 30.0);
    }

    #[test]
    fn same_seed_grows_identical_trees() {
        // identical columns tie on every split, so only the seed picks between them
        let samples: Vec<_> = (0..20).map(|i| row(f64::from(i), f64::from(i))).collect();
        let targets: Vec<_> = (0..20).map(|i| f64::from(i % 7) * 10.0).collect();

        let first = RegressionTree::fit(&samples, &targets, &params(5, 1), 123).expect("fits");
        let second = RegressionTree::fit(&samples, &targets, &params(5, 1), 123).expect("fits");
        assert_eq!(first, second);
        assert!(first.validate().is_ok());
    }

    #[test]
    fn rejects_empty_and_mismatched_inputs() {
        assert!(matches!(
            RegressionTree::fit(&[], &[], &params(3, 1), 1),
            Err(TrainingError::NoSamples)
        ));
        assert!(matches!(
            RegressionTree::fit(&[row(1.0, 0.0)], &[], &params(3, 1), 1),
            Err(TrainingError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            RegressionTree::fit(&[row(1.0, 0.0)], &[1.0], &params(3, 0), 1),
            Err(TrainingError::InvalidParams(_))
        ));
    }

    #[test]
    fn validate_rejects_backward_child_links() {
        let tree = RegressionTree {
            seed: 0,
            nodes: vec![TreeNode::Split {
                feature: 0,
                threshold: 1.0,
                left: 0,
                right: 0,
            }],
        };
        assert!(tree.validate().is_err());
    }

    #[test]
    fn midpoint_never_reaches_the_upper_value() {
        assert_eq!(midpoint(1.0, 3.0), 2.0);
        let low: f64 = 1.0;
        let high = f64::from_bits(low.to_bits() + 1);
        assert_eq!(midpoint(low, high), low);
    }
}
