use std::collections::{BTreeMap, HashSet};

use crate::ingest::types::{Action, TransactionRecord};

use super::matrix::WalletFeatures;

const SECS_PER_DAY: f64 = 86_400.0;

/// Group records by wallet and compute each wallet's features.
/// The map is ordered by wallet address.
pub fn extract_features(records: &[TransactionRecord]) -> BTreeMap<String, WalletFeatures> {
    let mut grouped: BTreeMap<&str, Vec<&TransactionRecord>> = BTreeMap::new();
    for record in records {
        grouped
            .entry(record.wallet_address.as_str())
            .or_default()
            .push(record);
    }

    let features: BTreeMap<String, WalletFeatures> = grouped
        .into_iter()
        .map(|(wallet, txs)| (wallet.to_string(), wallet_features(&txs)))
        .collect();

    tracing::info!(
        transactions = records.len(),
        wallets = features.len(),
        "Extracted wallet features"
    );
    features
}

/// Features for a single wallet's transactions, in any order.
pub fn wallet_features(txs: &[&TransactionRecord]) -> WalletFeatures {
    // Fixed aggregation order keeps float sums independent of log order.
    let mut txs = txs.to_vec();
    txs.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.usd_amount.total_cmp(&b.usd_amount))
    });

    let mut f = WalletFeatures {
        total_txs: txs.len() as u64,
        ..Default::default()
    };

    let mut action_counts: BTreeMap<&Action, u64> = BTreeMap::new();
    let mut senders: HashSet<&str> = HashSet::new();

    for tx in &txs {
        *action_counts.entry(&tx.action).or_default() += 1;

        match tx.action {
            Action::Deposit => {
                f.deposit_count += 1;
                f.total_deposit_value += tx.usd_amount;
            }
            Action::Borrow => {
                f.borrow_count += 1;
                f.total_borrow_value += tx.usd_amount;
            }
            Action::Repay => f.repay_count += 1,
            Action::Redeem => f.redeem_count += 1,
            Action::Liquidation => f.liquidation_count += 1,
            Action::Other(_) => {}
        }

        f.total_usd_volume += tx.usd_amount;
        f.max_usd_amount = f.max_usd_amount.max(tx.usd_amount);

        if let Some(sender) = tx.counterparty.as_deref() {
            senders.insert(sender);
        }
    }

    let denom = f.total_txs.max(1) as f64;
    f.avg_usd_amount = f.total_usd_volume / denom;
    f.borrow_ratio = f.borrow_count as f64 / denom;
    f.borrow_to_deposit_ratio = f.total_borrow_value / f.total_deposit_value.max(1.0);
    f.unique_tx_senders = senders.len() as u64;
    f.tx_entropy = shannon_entropy(action_counts.values().copied(), f.total_txs);

    let timestamps: Vec<i64> = txs.iter().map(|tx| tx.timestamp.timestamp_millis()).collect();

    if let (Some(first), Some(last)) = (timestamps.first(), timestamps.last()) {
        f.wallet_age_days = (last - first) as f64 / 1000.0 / SECS_PER_DAY;
    }

    let gaps: Vec<f64> = timestamps
        .windows(2)
        .map(|w| (w[1] - w[0]) as f64 / 1000.0)
        .collect();
    let (mean, std) = mean_and_sample_std(&gaps);
    f.time_between_txs_mean = mean;
    f.time_between_txs_std = std;

    f
}

/// Base-2 Shannon entropy of a count distribution. Exactly 0.0 when only
/// one category is present.
fn shannon_entropy(counts: impl Iterator<Item = u64>, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    counts
        .filter(|&c| c > 0)
        .map(|c| {
            let p = c as f64 / total;
            p * (1.0 / p).log2()
        })
        .sum()
}

/// Mean and sample (n - 1) standard deviation; zero where undefined.
fn mean_and_sample_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var.sqrt())
}
