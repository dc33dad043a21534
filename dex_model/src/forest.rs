//! Isolation forest anomaly detection: a collection of extremely randomized
//! trees built on subsamples of the cells. Outliers are isolated in few
//! splits, so their average path length is short. Scores follow the usual
//! decision-function convention: `0.5 - 2^(-E[h]/c(psi))`, negative for
//! outliers, lower = more anomalous.

use crate::{AnomalyScorer, CellScore};
use anyhow::Result;
use dex_types::ConfigError;
use ndarray::{ArrayView1, ArrayView2};
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// Euler-Mascheroni constant, for the harmonic-number approximation in the
/// expected path length.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Isolation forest hyper-parameters. The defaults follow common practice:
/// 100 trees over subsamples of at most 256 cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_samples: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> ForestParams {
        ForestParams {
            n_trees: 100,
            max_samples: 256,
            seed: 0,
        }
    }
}

impl ForestParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_trees == 0 {
            return Err(ConfigError::ZeroTrees);
        }
        if self.max_samples == 0 {
            return Err(ConfigError::ZeroSampleSize);
        }
        Ok(())
    }
}

enum Node {
    Split {
        feature: usize,
        value: f64,
        left: usize,
        right: usize,
    },
    /// Terminal node; `path_length` is the node depth plus the expected
    /// remaining path length for the cells that landed here.
    Leaf { path_length: f64 },
}

struct Tree {
    nodes: Vec<Node>,
    root: usize,
}

/// A fitted (or not-yet-fitted) isolation forest. Fitting is deterministic
/// given `params.seed`; refitting on the same input reproduces the same
/// trees.
pub struct IsolationForest {
    params: ForestParams,
    trees: Vec<Tree>,
    sample_size: usize,
    fitted: bool,
}

impl IsolationForest {
    pub fn new(params: ForestParams) -> IsolationForest {
        IsolationForest {
            params,
            trees: Vec::new(),
            sample_size: 0,
            fitted: false,
        }
    }

    fn path_length(tree: &Tree, row: ArrayView1<'_, f64>) -> f64 {
        let mut node = tree.root;
        loop {
            match tree.nodes[node] {
                Node::Leaf { path_length } => return path_length,
                Node::Split {
                    feature,
                    value,
                    left,
                    right,
                } => {
                    node = if row[feature] < value { left } else { right };
                }
            }
        }
    }
}

impl AnomalyScorer for IsolationForest {
    fn fit(&mut self, features: ArrayView2<'_, f64>) -> Result<()> {
        self.params.validate()?;
        let n = features.nrows();
        self.sample_size = self.params.max_samples.min(n);
        self.trees.clear();
        self.fitted = true;

        if self.sample_size <= 1 {
            // nothing to split; score() degenerates to 0 for every cell
            return Ok(());
        }

        let mut rng = Pcg64Mcg::seed_from_u64(self.params.seed);
        let height_limit = (self.sample_size as f64).log2().ceil() as usize;

        for _ in 0..self.params.n_trees {
            let rows = if self.sample_size == n {
                (0..n).collect()
            } else {
                sample(&mut rng, n, self.sample_size).into_vec()
            };
            let mut tree = Tree {
                nodes: Vec::new(),
                root: 0,
            };
            tree.root = build_node(&mut tree.nodes, features, rows, 0, height_limit, &mut rng);
            self.trees.push(tree);
        }
        Ok(())
    }

    fn score(&self, features: ArrayView2<'_, f64>) -> Result<Vec<CellScore>> {
        if !self.fitted {
            return Err(ConfigError::ModelNotFitted.into());
        }
        // A forest of single-leaf trees means no split separated any cells
        // (all-identical input); every cell is equally unremarkable.
        if self.sample_size <= 1
            || self.trees.is_empty()
            || self.trees.iter().all(|tree| tree.nodes.len() == 1)
        {
            return Ok(features
                .rows()
                .into_iter()
                .map(|_| CellScore {
                    anomaly_score: 0.0,
                    likely_binder: false,
                })
                .collect());
        }

        let normalization = average_path_length(self.sample_size);
        Ok(features
            .rows()
            .into_iter()
            .map(|row| {
                let mean_path = self
                    .trees
                    .iter()
                    .map(|tree| Self::path_length(tree, row))
                    .sum::<f64>()
                    / self.trees.len() as f64;
                let anomaly_score = 0.5 - 2f64.powf(-mean_path / normalization);
                CellScore {
                    anomaly_score,
                    likely_binder: anomaly_score < 0.0,
                }
            })
            .collect())
    }
}

fn build_node(
    nodes: &mut Vec<Node>,
    features: ArrayView2<'_, f64>,
    rows: Vec<usize>,
    depth: usize,
    height_limit: usize,
    rng: &mut Pcg64Mcg,
) -> usize {
    let split = if depth >= height_limit || rows.len() <= 1 {
        None
    } else {
        pick_split(features, &rows, rng)
    };

    match split {
        None => {
            nodes.push(Node::Leaf {
                path_length: depth as f64 + average_path_length(rows.len()),
            });
        }
        Some((feature, value)) => {
            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                .into_iter()
                .partition(|&r| features[[r, feature]] < value);
            let left = build_node(nodes, features, left_rows, depth + 1, height_limit, rng);
            let right = build_node(nodes, features, right_rows, depth + 1, height_limit, rng);
            nodes.push(Node::Split {
                feature,
                value,
                left,
                right,
            });
        }
    }
    nodes.len() - 1
}

/// Choose a random feature with spread among `rows` and a random split value
/// strictly inside its range. Returns `None` when every feature is constant
/// over `rows` (the cells are indistinguishable).
fn pick_split(
    features: ArrayView2<'_, f64>,
    rows: &[usize],
    rng: &mut Pcg64Mcg,
) -> Option<(usize, f64)> {
    let candidates: Vec<(usize, f64, f64)> = (0..features.ncols())
        .filter_map(|j| {
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            for &r in rows {
                let v = features[[r, j]];
                min = min.min(v);
                max = max.max(v);
            }
            (min < max).then_some((j, min, max))
        })
        .collect();

    if candidates.is_empty() {
        return None;
    }
    let (feature, min, max) = candidates[rng.gen_range(0..candidates.len())];
    Some((feature, rng.gen_range(min..max)))
}

/// Expected path length `c(n)` of an unsuccessful search in a binary search
/// tree over `n` items; normalizes isolation depths across subsample sizes.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        n => {
            let m = (n - 1) as f64;
            2.0 * (m.ln() + EULER_GAMMA) - 2.0 * m / n as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// A tight cluster of cells plus one far-away outlier at row 0.
    fn cluster_with_outlier(n: usize) -> Array2<f64> {
        let mut rng = Pcg64Mcg::seed_from_u64(42);
        let mut features = Array2::zeros((n, 4));
        for i in 1..n {
            for j in 0..4 {
                features[[i, j]] = rng.gen_range(-0.5..0.5);
            }
        }
        for j in 0..4 {
            features[[0, j]] = 8.0;
        }
        features
    }

    fn fitted(features: &Array2<f64>, seed: u64) -> IsolationForest {
        let mut forest = IsolationForest::new(ForestParams {
            seed,
            ..ForestParams::default()
        });
        forest.fit(features.view()).unwrap();
        forest
    }

    #[test]
    fn test_outlier_scores_below_inliers() {
        let features = cluster_with_outlier(200);
        let scores = fitted(&features, 0).score(features.view()).unwrap();
        let outlier = scores[0].anomaly_score;
        for inlier in &scores[1..] {
            assert!(outlier < inlier.anomaly_score);
        }
        assert!(scores[0].likely_binder);
    }

    #[test]
    fn test_deterministic_given_seed() {
        let features = cluster_with_outlier(100);
        let a = fitted(&features, 7).score(features.view()).unwrap();
        let b = fitted(&features, 7).score(features.view()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_refit_reproduces_state() {
        let features = cluster_with_outlier(100);
        let mut forest = fitted(&features, 3);
        let a = forest.score(features.view()).unwrap();
        forest.fit(features.view()).unwrap();
        let b = forest.score(features.view()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_identical_cells_score_zero_without_labels() {
        let features = Array2::zeros((50, 4));
        let scores = fitted(&features, 0).score(features.view()).unwrap();
        assert_eq!(scores.len(), 50);
        for score in scores {
            assert_eq!(score.anomaly_score, 0.0);
            assert!(!score.likely_binder);
        }
    }

    #[test]
    fn test_unfitted_forest_is_a_config_error() {
        let forest = IsolationForest::new(ForestParams::default());
        let features = Array2::zeros((3, 4));
        let err = forest.score(features.view()).unwrap_err();
        assert_eq!(
            err.downcast::<ConfigError>().unwrap(),
            ConfigError::ModelNotFitted
        );
    }

    #[test]
    fn test_zero_trees_rejected() {
        let mut forest = IsolationForest::new(ForestParams {
            n_trees: 0,
            ..ForestParams::default()
        });
        let features = Array2::zeros((3, 4));
        assert!(forest.fit(features.view()).is_err());
    }

    #[test]
    fn test_empty_input() {
        let features = Array2::<f64>::zeros((0, 4));
        let mut forest = IsolationForest::new(ForestParams::default());
        forest.fit(features.view()).unwrap();
        assert!(forest.score(features.view()).unwrap().is_empty());
    }

    #[test]
    fn test_single_cell_scores_zero() {
        let features = Array2::from_elem((1, 4), 2.0);
        let scores = fitted(&features, 0).score(features.view()).unwrap();
        assert_eq!(scores[0].anomaly_score, 0.0);
        assert!(!scores[0].likely_binder);
    }
}
