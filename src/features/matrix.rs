use serde::Serialize;

/// Column names of the wallet feature vector, in row order.
pub const FEATURE_NAMES: [&str; 18] = [
    "total_txs",
    "deposit_count",
    "borrow_count",
    "repay_count",
    "redeem_count",
    "liquidation_count",
    "total_usd_volume",
    "avg_usd_amount",
    "max_usd_amount",
    "borrow_ratio",
    "wallet_age_days",
    "unique_tx_senders",
    "tx_entropy",
    "time_between_txs_mean",
    "time_between_txs_std",
    "total_deposit_value",
    "total_borrow_value",
    "borrow_to_deposit_ratio",
];

/// Aggregate statistics for one wallet. Every field is finite.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WalletFeatures {
    pub total_txs: u64,
    pub deposit_count: u64,
    pub borrow_count: u64,
    pub repay_count: u64,
    pub redeem_count: u64,
    pub liquidation_count: u64,
    pub total_usd_volume: f64,
    pub avg_usd_amount: f64,
    pub max_usd_amount: f64,
    pub borrow_ratio: f64,
    pub wallet_age_days: f64,
    pub unique_tx_senders: u64,
    pub tx_entropy: f64,
    pub time_between_txs_mean: f64,
    pub time_between_txs_std: f64,
    pub total_deposit_value: f64,
    pub total_borrow_value: f64,
    pub borrow_to_deposit_ratio: f64,
}

impl WalletFeatures {
    /// The feature vector in `FEATURE_NAMES` order.
    pub fn to_row(&self) -> Vec<f64> {
        vec![
            self.total_txs as f64,
            self.deposit_count as f64,
            self.borrow_count as f64,
            self.repay_count as f64,
            self.redeem_count as f64,
            self.liquidation_count as f64,
            self.total_usd_volume,
            self.avg_usd_amount,
            self.max_usd_amount,
            self.borrow_ratio,
            self.wallet_age_days,
            self.unique_tx_senders as f64,
            self.tx_entropy,
            self.time_between_txs_mean,
            self.time_between_txs_std,
            self.total_deposit_value,
            self.total_borrow_value,
            self.borrow_to_deposit_ratio,
        ]
    }
}

/// Dense wallets x features matrix. Row `i` belongs to `wallets[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub wallets: Vec<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Build a matrix from per-wallet features. Rows follow the iteration
    /// order of `features`, so pass an ordered map for reproducible output.
    pub fn from_features<'a, I>(features: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a WalletFeatures)>,
    {
        let mut wallets = Vec::new();
        let mut rows = Vec::new();
        for (wallet, f) in features {
            wallets.push(wallet.clone());
            rows.push(f.to_row());
        }
        Self {
            wallets,
            columns: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            rows,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn column(&self, idx: usize) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(move |row| row[idx])
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Copy of the matrix restricted to the named columns, in that order.
    /// Returns `None` if any name is missing.
    pub fn select(&self, names: &[String]) -> Option<Self> {
        let indices = names
            .iter()
            .map(|n| self.column_index(n))
            .collect::<Option<Vec<_>>>()?;
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i]).collect())
            .collect();
        Some(Self {
            wallets: self.wallets.clone(),
            columns: names.to_vec(),
            rows,
        })
    }
}
