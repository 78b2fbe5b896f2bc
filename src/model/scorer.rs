use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::error::{ScoreError, ScoreResult};
use crate::features::FeatureMatrix;

use super::forest::IsolationForest;
use super::scaler::StandardScaler;
use super::{AnomalyModel, ScoreOrientation};

pub const MAX_CREDIT_SCORE: u32 = 1000;

/// Final per-wallet output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletScore {
    pub wallet_address: String,
    pub raw_anomaly_score: f64,
    pub credit_score: u32,
}

/// Fits the scaler and forest over one wallet population.
pub struct CreditScorer {
    config: ModelConfig,
}

impl CreditScorer {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    /// Fit on `matrix`. The raw score extrema of this population become the
    /// model's rescaling bounds.
    pub fn fit(&self, matrix: &FeatureMatrix) -> ScoreResult<CreditModel> {
        if matrix.n_rows() < 2 {
            return Err(ScoreError::model(format!(
                "cannot fit an anomaly model on {} wallet(s), need at least 2",
                matrix.n_rows()
            )));
        }

        let scaler = StandardScaler::fit(matrix)?;
        let standardized = scaler.transform(matrix)?;
        let forest = IsolationForest::fit(&standardized, &self.config)?;
        let raw = forest.decision_scores(&standardized)?;

        let (raw_min, raw_max) = raw
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| (lo.min(r), hi.max(r)));

        tracing::info!(
            wallets = matrix.n_rows(),
            features = scaler.columns.len(),
            dropped = scaler.dropped.len(),
            raw_min,
            raw_max,
            "Fitted credit model"
        );

        Ok(CreditModel {
            scaler,
            forest,
            raw_min,
            raw_max,
        })
    }

    /// Fit on `matrix` and score the same population, ranked.
    pub fn fit_and_score(
        &self,
        matrix: &FeatureMatrix,
    ) -> ScoreResult<(CreditModel, Vec<WalletScore>)> {
        let model = self.fit(matrix)?;
        let mut scores = model.score(matrix)?;
        rank_scores(&mut scores);
        Ok((model, scores))
    }
}

/// A fitted scaler + forest pair together with the raw score range of the
/// population it was fitted on. Scores from one model are only comparable
/// with each other, not with scores from a model fitted on other wallets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditModel {
    pub scaler: StandardScaler,
    pub forest: IsolationForest,
    pub raw_min: f64,
    pub raw_max: f64,
}

impl CreditModel {
    pub fn raw_scores(&self, matrix: &FeatureMatrix) -> ScoreResult<Vec<f64>> {
        let standardized = self.scaler.transform(matrix)?;
        self.forest.decision_scores(&standardized)
    }

    /// Score every wallet in `matrix`, in matrix row order.
    pub fn score(&self, matrix: &FeatureMatrix) -> ScoreResult<Vec<WalletScore>> {
        let orientation = self.forest.orientation();
        let raw = self.raw_scores(matrix)?;

        Ok(matrix
            .wallets
            .iter()
            .zip(raw)
            .map(|(wallet, raw)| WalletScore {
                wallet_address: wallet.clone(),
                raw_anomaly_score: raw,
                credit_score: to_credit_score(raw, self.raw_min, self.raw_max, orientation),
            })
            .collect())
    }

    pub fn to_json(&self) -> eyre::Result<String> {
        serde_json::to_string(self).map_err(|e| eyre::eyre!("Failed to serialize credit model: {}", e))
    }

    pub fn save(&self, path: &str) -> eyre::Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json)
            .map_err(|e| eyre::eyre!("Failed to write model file '{}': {}", path, e))?;
        tracing::info!(path, "Credit model saved");
        Ok(())
    }

    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read model file '{}': {}", path, e))?;
        let model: CreditModel = serde_json::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse model file '{}': {}", path, e))?;
        Ok(model)
    }
}

/// Min-max rescale a raw score onto `[0, MAX_CREDIT_SCORE]` so that the
/// most anomalous end of `[min, max]` maps to 0. Values outside the range
/// are clamped. A degenerate range maps everything to the maximum.
pub fn to_credit_score(raw: f64, min: f64, max: f64, orientation: ScoreOrientation) -> u32 {
    let span = max - min;
    if !span.is_finite() || span <= 0.0 {
        return MAX_CREDIT_SCORE;
    }
    let normalized = ((raw - min) / span).clamp(0.0, 1.0);
    let normality = match orientation {
        ScoreOrientation::LowerIsAnomalous => normalized,
        ScoreOrientation::HigherIsAnomalous => 1.0 - normalized,
    };
    (normality * MAX_CREDIT_SCORE as f64).round() as u32
}

/// Sort by credit score descending, ties by wallet address.
pub fn rank_scores(scores: &mut [WalletScore]) {
    scores.sort_by(|a, b| {
        b.credit_score
            .cmp(&a.credit_score)
            .then_with(|| a.wallet_address.cmp(&b.wallet_address))
    });
}
