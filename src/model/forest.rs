//! Isolation forest anomaly detector.
//!
//! Each tree isolates a random subsample by splitting on a random feature at
//! a random threshold. Anomalies sit in sparse regions and are isolated in
//! fewer splits, so their average path length over the ensemble is short.
//! All randomness comes from a single seeded `ChaCha8Rng`, so the same seed
//! and the same rows always produce the same forest.

use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::error::{ScoreError, ScoreResult};

use super::{AnomalyModel, ScoreOrientation};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

impl Node {
    fn path_length(&self, row: &[f64], depth: usize) -> f64 {
        match self {
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if row[*feature] <= *threshold {
                    left.path_length(row, depth + 1)
                } else {
                    right.path_length(row, depth + 1)
                }
            }
            Node::Leaf { size } => depth as f64 + average_path_length(*size),
        }
    }
}

/// A fitted ensemble of isolation trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForest {
    trees: Vec<Node>,
    sample_size: usize,
    n_features: usize,
}

impl IsolationForest {
    /// Fit a forest over standardized rows.
    pub fn fit(rows: &[Vec<f64>], config: &ModelConfig) -> ScoreResult<Self> {
        if rows.len() < 2 {
            return Err(ScoreError::model(format!(
                "need at least 2 rows to fit an isolation forest, got {}",
                rows.len()
            )));
        }
        let n_features = rows[0].len();
        if n_features == 0 {
            return Err(ScoreError::model("cannot fit an isolation forest with no features"));
        }
        if rows.iter().any(|r| r.len() != n_features) {
            return Err(ScoreError::model("feature rows have inconsistent widths"));
        }

        let sample_size = config.max_samples.min(rows.len());
        let height_limit = (sample_size as f64).log2().ceil() as usize;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        let trees = (0..config.n_estimators)
            .map(|_| {
                let sample: Vec<usize> =
                    index::sample(&mut rng, rows.len(), sample_size).into_vec();
                build_tree(rows, sample, 0, height_limit, &mut rng)
            })
            .collect();

        tracing::debug!(
            trees = config.n_estimators,
            sample_size,
            height_limit,
            seed = config.seed,
            "Fitted isolation forest"
        );

        Ok(Self {
            trees,
            sample_size,
            n_features,
        })
    }

    /// Anomaly score in (0, 1]; values near 1 are anomalous, well below 0.5
    /// are normal.
    pub fn anomaly_score(&self, row: &[f64]) -> f64 {
        let mean_path = self
            .trees
            .iter()
            .map(|tree| tree.path_length(row, 0))
            .sum::<f64>()
            / self.trees.len().max(1) as f64;
        let norm = average_path_length(self.sample_size);
        if norm <= 0.0 {
            return 0.5;
        }
        2f64.powf(-mean_path / norm)
    }
}

impl AnomalyModel for IsolationForest {
    fn orientation(&self) -> ScoreOrientation {
        ScoreOrientation::LowerIsAnomalous
    }

    /// `0.5 - anomaly_score`: negative for outliers, positive for inliers.
    fn decision_scores(&self, rows: &[Vec<f64>]) -> ScoreResult<Vec<f64>> {
        if let Some(bad) = rows.iter().find(|r| r.len() != self.n_features) {
            return Err(ScoreError::model(format!(
                "row has {} features, forest was fitted on {}",
                bad.len(),
                self.n_features
            )));
        }
        Ok(rows.iter().map(|row| 0.5 - self.anomaly_score(row)).collect())
    }
}

fn build_tree(
    rows: &[Vec<f64>],
    sample: Vec<usize>,
    depth: usize,
    height_limit: usize,
    rng: &mut ChaCha8Rng,
) -> Node {
    if depth >= height_limit || sample.len() <= 1 {
        return Node::Leaf { size: sample.len() };
    }

    // Only features that still vary inside this node can split it.
    let candidates: Vec<(usize, f64, f64)> = (0..rows[sample[0]].len())
        .filter_map(|feature| {
            let (lo, hi) = sample.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                (lo.min(rows[i][feature]), hi.max(rows[i][feature]))
            });
            (lo < hi).then_some((feature, lo, hi))
        })
        .collect();

    let Some(&(feature, lo, hi)) = candidates.choose(rng) else {
        return Node::Leaf { size: sample.len() };
    };

    let threshold = rng.gen_range(lo..hi);
    let (left, right): (Vec<usize>, Vec<usize>) =
        sample.into_iter().partition(|&i| rows[i][feature] <= threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(build_tree(rows, left, depth + 1, height_limit, rng)),
        right: Box::new(build_tree(rows, right, depth + 1, height_limit, rng)),
    }
}

/// Expected path length of an unsuccessful BST search over `n` points,
/// used both to normalize scores and to credit unsplit leaves.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}
