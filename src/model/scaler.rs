use serde::{Deserialize, Serialize};

use crate::error::{ScoreError, ScoreResult};
use crate::features::FeatureMatrix;

/// Columns whose spread is below this fraction of their magnitude are
/// treated as constant.
const ZERO_VARIANCE_TOLERANCE: f64 = 1e-12;

/// Per-column standardization fitted on one population. Columns with zero
/// variance are dropped at fit time and remembered in `dropped`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub columns: Vec<String>,
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
    pub dropped: Vec<String>,
}

impl StandardScaler {
    pub fn fit(matrix: &FeatureMatrix) -> ScoreResult<Self> {
        if matrix.n_rows() < 2 {
            return Err(ScoreError::model(format!(
                "need at least 2 wallets to standardize features, got {}",
                matrix.n_rows()
            )));
        }

        let n = matrix.n_rows() as f64;
        let mut scaler = Self {
            columns: Vec::new(),
            means: Vec::new(),
            scales: Vec::new(),
            dropped: Vec::new(),
        };

        for (idx, name) in matrix.columns.iter().enumerate() {
            let mean = matrix.column(idx).sum::<f64>() / n;
            let var = matrix.column(idx).map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();

            if !std.is_finite() || std <= ZERO_VARIANCE_TOLERANCE * mean.abs().max(1.0) {
                tracing::warn!(column = %name, "Dropping zero-variance feature column");
                scaler.dropped.push(name.clone());
                continue;
            }

            scaler.columns.push(name.clone());
            scaler.means.push(mean);
            scaler.scales.push(std);
        }

        if scaler.columns.is_empty() {
            return Err(ScoreError::model(
                "every feature column has zero variance, nothing to fit",
            ));
        }

        tracing::debug!(
            kept = scaler.columns.len(),
            dropped = scaler.dropped.len(),
            "Fitted feature scaler"
        );
        Ok(scaler)
    }

    /// Standardize `matrix` with the fitted parameters. The matrix must
    /// contain every column the scaler kept; extra columns are ignored.
    pub fn transform(&self, matrix: &FeatureMatrix) -> ScoreResult<Vec<Vec<f64>>> {
        let selected = matrix.select(&self.columns).ok_or_else(|| {
            ScoreError::model(format!(
                "feature matrix is missing columns required by the scaler: {:?}",
                self.columns
                    .iter()
                    .filter(|c| matrix.column_index(c).is_none())
                    .collect::<Vec<_>>()
            ))
        })?;

        Ok(selected
            .rows
            .into_iter()
            .map(|row| {
                row.iter()
                    .zip(self.means.iter().zip(&self.scales))
                    .map(|(v, (mean, scale))| (v - mean) / scale)
                    .collect()
            })
            .collect())
    }
}
