use std::collections::HashMap;

use crate::features::FeatureMatrix;
use crate::model::scorer::MAX_CREDIT_SCORE;
use crate::model::WalletScore;

const BIN_WIDTH: u32 = 100;

const INTERPRETATION: [(&str, &str); 4] = [
    ("900-1000", "Ideal borrowers: consistent deposits, low liquidation risk"),
    ("700-900", "Reliable users: healthy financial ratios"),
    ("400-700", "Moderate risk: occasional liquidations"),
    ("0-400", "High risk: potential bots or exploit patterns"),
];

/// Count of wallets per score range of width 100. The top bin is closed so
/// 1000 lands in `900-1000`.
pub fn score_histogram(scores: &[WalletScore]) -> Vec<(String, usize)> {
    let n_bins = (MAX_CREDIT_SCORE / BIN_WIDTH) as usize;
    let mut counts = vec![0usize; n_bins];
    for s in scores {
        let bin = ((s.credit_score / BIN_WIDTH) as usize).min(n_bins - 1);
        counts[bin] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| {
            let lo = i as u32 * BIN_WIDTH;
            let hi = if i == n_bins - 1 { MAX_CREDIT_SCORE } else { lo + BIN_WIDTH - 1 };
            (format!("{}-{}", lo, hi), count)
        })
        .collect()
}

/// Pearson correlation of each feature column with the credit score,
/// sorted ascending. Constant columns correlate as 0.
pub fn feature_correlations(matrix: &FeatureMatrix, scores: &[WalletScore]) -> Vec<(String, f64)> {
    let score_of: HashMap<&str, f64> = scores
        .iter()
        .map(|s| (s.wallet_address.as_str(), s.credit_score as f64))
        .collect();
    let paired: Vec<(usize, f64)> = matrix
        .wallets
        .iter()
        .enumerate()
        .filter_map(|(i, w)| score_of.get(w.as_str()).map(|&s| (i, s)))
        .collect();
    let ys: Vec<f64> = paired.iter().map(|&(_, s)| s).collect();

    let mut out: Vec<(String, f64)> = matrix
        .columns
        .iter()
        .enumerate()
        .map(|(col, name)| {
            let xs: Vec<f64> = paired.iter().map(|&(row, _)| matrix.rows[row][col]).collect();
            (name.clone(), pearson(&xs, &ys))
        })
        .collect();
    out.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    out
}

fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let mx = xs.iter().sum::<f64>() / n as f64;
    let my = ys.iter().sum::<f64>() / n as f64;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mx, y - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    let denom = (sxx * syy).sqrt();
    if denom > 0.0 && denom.is_finite() {
        sxy / denom
    } else {
        0.0
    }
}

/// Render the markdown analysis report.
pub fn render_analysis(
    matrix: &FeatureMatrix,
    scores: &[WalletScore],
    dropped_columns: &[String],
) -> String {
    let mut md = String::new();
    let n = scores.len();
    let mean = if n == 0 {
        0.0
    } else {
        scores.iter().map(|s| s.credit_score as f64).sum::<f64>() / n as f64
    };
    let mut sorted: Vec<u32> = scores.iter().map(|s| s.credit_score).collect();
    sorted.sort_unstable();
    let median = sorted.get(n / 2).copied().unwrap_or(0);

    md.push_str("# Wallet Credit Score Report\n\n");
    md.push_str("## Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Wallets scored | {} |\n", n));
    md.push_str(&format!("| Mean score | {:.1} |\n", mean));
    md.push_str(&format!("| Median score | {} |\n", median));
    md.push_str(&format!("| Min score | {} |\n", sorted.first().copied().unwrap_or(0)));
    md.push_str(&format!("| Max score | {} |\n\n", sorted.last().copied().unwrap_or(0)));

    md.push_str("## Score Distribution\n\n");
    md.push_str("| Score Range | Wallets |\n");
    md.push_str("|-------------|---------|\n");
    for (range, count) in score_histogram(scores) {
        md.push_str(&format!("| {} | {} |\n", range, count));
    }
    md.push('\n');

    md.push_str("## Feature Correlations\n\n");
    md.push_str("| Feature | Correlation with credit score |\n");
    md.push_str("|---------|-------------------------------|\n");
    for (name, corr) in feature_correlations(matrix, scores) {
        md.push_str(&format!("| {} | {:.4} |\n", name, corr));
    }
    md.push('\n');

    if !dropped_columns.is_empty() {
        md.push_str("## Dropped Features\n\n");
        md.push_str("Zero variance across all wallets, excluded from the model:\n\n");
        for name in dropped_columns {
            md.push_str(&format!("- {}\n", name));
        }
        md.push('\n');
    }

    md.push_str("## Score Interpretation\n\n");
    md.push_str("| Score Range | Behavior Profile |\n");
    md.push_str("|-------------|------------------|\n");
    for (range, profile) in INTERPRETATION {
        md.push_str(&format!("| {} | {} |\n", range, profile));
    }
    md.push_str(
        "\nScores are relative to this batch of wallets and are not comparable across runs over different populations.\n",
    );

    md
}
