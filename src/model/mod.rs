pub mod forest;
pub mod scaler;
pub mod scorer;

pub use forest::IsolationForest;
pub use scaler::StandardScaler;
pub use scorer::{rank_scores, to_credit_score, CreditModel, CreditScorer, WalletScore};

use serde::{Deserialize, Serialize};

use crate::error::ScoreResult;

/// Which end of a model's raw score range marks outliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreOrientation {
    LowerIsAnomalous,
    HigherIsAnomalous,
}

/// An unsupervised detector producing one continuous score per row.
pub trait AnomalyModel {
    fn orientation(&self) -> ScoreOrientation;

    fn decision_scores(&self, rows: &[Vec<f64>]) -> ScoreResult<Vec<f64>>;
}
