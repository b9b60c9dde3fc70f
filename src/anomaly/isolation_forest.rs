//! Isolation Forest anomaly detection
//!
//! Trees are grown on random sub-samples by repeatedly choosing a random
//! feature and a random split value inside the node's observed range.
//! Points that get isolated after few splits are anomalous. Raw scores are
//! `-2^(-E[h(x)] / c(max_samples))`, so higher means more normal, and the
//! decision function subtracts an offset calibrated from the contamination
//! ratio.

use crate::anomaly::AnomalyDetector;
use crate::error::{AnomalyError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand::seq::index;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Spread below which a feature is considered constant within a node
const FEATURE_THRESHOLD: f64 = 1e-7;

/// Average path length of an unsuccessful search in a BST of `n` items.
///
/// `c(n) = 2 (ln(n - 1) + γ) - 2 (n - 1) / n` for `n > 2`,
/// with `c(1) = 0` and `c(2) = 1`.
pub fn average_path_length(n: usize) -> f64 {
    if n <= 1 {
        0.0
    } else if n == 2 {
        1.0
    } else {
        let n_f = n as f64;
        2.0 * ((n_f - 1.0).ln() + EULER_GAMMA) - 2.0 * (n_f - 1.0) / n_f
    }
}

/// Linear-interpolated percentile of an ascending slice, `q` in `[0, 100]`
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = (q / 100.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Isolation Tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IsolationTree {
    /// Internal node with split
    Internal {
        /// Feature index for split
        feature: usize,
        /// Split threshold
        threshold: f64,
        /// Left subtree (values <= threshold)
        left: Box<IsolationTree>,
        /// Right subtree (values > threshold)
        right: Box<IsolationTree>,
    },
    /// External (leaf) node
    External {
        /// Number of samples in this node
        size: usize,
    },
}

impl IsolationTree {
    /// Build an isolation tree over the rows of `x` selected by `indices`
    pub fn build(
        x: &Array2<f64>,
        indices: &[usize],
        height: usize,
        max_height: usize,
        rng: &mut impl Rng,
    ) -> Self {
        let n_samples = indices.len();

        if height >= max_height || n_samples <= 1 {
            return IsolationTree::External { size: n_samples };
        }

        // Visit features in random order and split on the first one that
        // still varies inside this node
        let mut features: Vec<usize> = (0..x.ncols()).collect();
        features.shuffle(rng);

        let split = features.into_iter().find_map(|feature| {
            let (min_val, max_val) = indices.iter().fold(
                (f64::INFINITY, f64::NEG_INFINITY),
                |(lo, hi), &i| {
                    let v = x[[i, feature]];
                    (lo.min(v), hi.max(v))
                },
            );
            (max_val > min_val + FEATURE_THRESHOLD).then_some((feature, min_val, max_val))
        });

        let Some((feature, min_val, max_val)) = split else {
            return IsolationTree::External { size: n_samples };
        };

        // Interpolate instead of `min + u * (max - min)` so huge ranges cannot overflow
        let u: f64 = rng.gen();
        let mut threshold = u * max_val + (1.0 - u) * min_val;
        if threshold >= max_val {
            threshold = min_val;
        }

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, feature]] <= threshold);

        if left_indices.is_empty() || right_indices.is_empty() {
            return IsolationTree::External { size: n_samples };
        }

        let left = Box::new(Self::build(x, &left_indices, height + 1, max_height, rng));
        let right = Box::new(Self::build(x, &right_indices, height + 1, max_height, rng));

        IsolationTree::Internal {
            feature,
            threshold,
            left,
            right,
        }
    }

    /// Path length for a sample: edges walked plus `c(size)` at the leaf
    pub fn path_length(&self, sample: ArrayView1<f64>, current_height: usize) -> f64 {
        match self {
            IsolationTree::External { size } => {
                current_height as f64 + average_path_length(*size)
            }
            IsolationTree::Internal {
                feature,
                threshold,
                left,
                right,
            } => {
                if sample[*feature] <= *threshold {
                    left.path_length(sample, current_height + 1)
                } else {
                    right.path_length(sample, current_height + 1)
                }
            }
        }
    }
}

/// Isolation Forest anomaly detector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    /// Number of trees
    n_estimators: usize,
    /// Maximum samples per tree
    max_samples: usize,
    /// Contamination ratio (expected proportion of outliers)
    contamination: f64,
    /// Random seed
    seed: Option<u64>,
    /// Fitted trees
    trees: Option<Vec<IsolationTree>>,
    /// Offset subtracted from raw scores by the decision function
    offset: Option<f64>,
    /// Samples actually drawn per tree during fitting
    samples_per_tree: Option<usize>,
    /// Number of features seen during fitting
    n_features: Option<usize>,
}

impl IsolationForest {
    /// Create new Isolation Forest
    pub fn new() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.1,
            seed: None,
            trees: None,
            offset: None,
            samples_per_tree: None,
            n_features: None,
        }
    }

    /// Set number of trees
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n.max(1);
        self
    }

    /// Set maximum samples per tree
    pub fn with_max_samples(mut self, n: usize) -> Self {
        self.max_samples = n.max(1);
        self
    }

    /// Set contamination ratio
    pub fn with_contamination(mut self, c: f64) -> Self {
        self.contamination = c.clamp(0.0, 0.5);
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    pub fn contamination(&self) -> f64 {
        self.contamination
    }

    /// Fitted trees, if any
    pub fn trees(&self) -> Option<&[IsolationTree]> {
        self.trees.as_deref()
    }

    fn validate_fit_input(x: &Array2<f64>) -> Result<()> {
        if x.nrows() == 0 {
            return Err(AnomalyError::InvalidInput(
                "cannot fit on an empty sample set".to_string(),
            ));
        }
        if x.ncols() == 0 {
            return Err(AnomalyError::InvalidInput(
                "samples must have at least one feature".to_string(),
            ));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(AnomalyError::InvalidInput(
                "input contains NaN or infinite values".to_string(),
            ));
        }
        Ok(())
    }

    /// Raw scores, higher means more normal
    fn compute_scores(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let trees = self.trees.as_ref().ok_or(AnomalyError::ModelNotFitted)?;
        let n_features = self.n_features.ok_or(AnomalyError::ModelNotFitted)?;

        if x.ncols() != n_features {
            return Err(AnomalyError::ShapeError {
                expected: format!("{} features", n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let c_n = average_path_length(self.samples_per_tree.unwrap_or(self.max_samples));

        let scores: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let sample = x.row(i);
                let avg_path_length = trees
                    .iter()
                    .map(|tree| tree.path_length(sample, 0))
                    .sum::<f64>()
                    / trees.len() as f64;

                // A single training sample gives c(n) = 0 and a path of 0; pin the ratio to 1
                let ratio = if c_n > 0.0 { avg_path_length / c_n } else { 1.0 };
                -(2.0_f64.powf(-ratio))
            })
            .collect();

        Ok(Array1::from_vec(scores))
    }
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new()
    }
}

impl AnomalyDetector for IsolationForest {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        Self::validate_fit_input(x)?;

        let n_samples = x.nrows();
        let samples_per_tree = self.max_samples.min(n_samples);
        let max_height = (samples_per_tree.max(2) as f64).log2().ceil() as usize;

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        // Seeds are drawn up front so the parallel build is reproducible
        let tree_seeds: Vec<u64> = (0..self.n_estimators).map(|_| rng.gen()).collect();

        let trees: Vec<IsolationTree> = tree_seeds
            .into_par_iter()
            .map(|tree_seed| {
                let mut tree_rng = StdRng::seed_from_u64(tree_seed);
                let indices = index::sample(&mut tree_rng, n_samples, samples_per_tree).into_vec();
                IsolationTree::build(x, &indices, 0, max_height, &mut tree_rng)
            })
            .collect();

        self.trees = Some(trees);
        self.samples_per_tree = Some(samples_per_tree);
        self.n_features = Some(x.ncols());

        let mut sorted_scores = self.compute_scores(x)?.to_vec();
        sorted_scores.sort_by(|a, b| a.total_cmp(b));
        self.offset = Some(percentile(&sorted_scores, 100.0 * self.contamination));

        Ok(())
    }

    fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.compute_scores(x)
    }

    fn offset(&self) -> Result<f64> {
        self.offset.ok_or(AnomalyError::ModelNotFitted)
    }
}
