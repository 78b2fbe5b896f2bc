use std::collections::HashMap;

use crate::features::FeatureMatrix;
use crate::model::WalletScore;

/// Which optional columns to include in the score table.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvColumns {
    pub raw_score: bool,
    pub features: bool,
}

/// Encode the score table in the order given. `matrix` supplies the feature
/// columns when `columns.features` is set. `path` only labels errors; nothing
/// is written to disk here.
pub fn render_scores_csv(
    path: &str,
    scores: &[WalletScore],
    matrix: &FeatureMatrix,
    columns: CsvColumns,
) -> eyre::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["wallet_address".to_string(), "credit_score".to_string()];
    if columns.raw_score {
        header.push("raw_anomaly_score".to_string());
    }
    if columns.features {
        header.extend(matrix.columns.iter().cloned());
    }
    writer
        .write_record(&header)
        .map_err(|e| eyre::eyre!("Failed to write header to scores CSV '{}': {}", path, e))?;

    let row_of: HashMap<&str, usize> = matrix
        .wallets
        .iter()
        .enumerate()
        .map(|(i, w)| (w.as_str(), i))
        .collect();

    for score in scores {
        let mut record = vec![score.wallet_address.clone(), score.credit_score.to_string()];
        if columns.raw_score {
            record.push(score.raw_anomaly_score.to_string());
        }
        if columns.features {
            let idx = row_of.get(score.wallet_address.as_str()).ok_or_else(|| {
                eyre::eyre!(
                    "No feature row for wallet '{}' in scores CSV '{}'",
                    score.wallet_address,
                    path
                )
            })?;
            record.extend(matrix.rows[*idx].iter().map(|v| v.to_string()));
        }
        writer.write_record(&record).map_err(|e| {
            eyre::eyre!(
                "Failed to write wallet '{}' to scores CSV '{}': {}",
                score.wallet_address,
                path,
                e
            )
        })?;
    }

    writer
        .into_inner()
        .map_err(|e| eyre::eyre!("Failed to flush scores CSV '{}': {}", path, e.error()))
}
