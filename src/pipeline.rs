use crate::config::{Config, OutputConfig};
use crate::features::{extract_features, FeatureMatrix};
use crate::ingest::{load_transactions, TransactionRecord};
use crate::model::{CreditModel, CreditScorer, WalletScore};
use crate::report::{render_analysis, render_scores_csv, write_all_or_nothing, CsvColumns};
use crate::ScoreResult;

/// Counters describing one completed run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunSummary {
    pub transactions: u64,
    pub skipped_lines: u64,
    pub wallets_scored: u64,
    pub features_used: u64,
    pub features_dropped: u64,
}

/// Everything a run computed, before anything is written out.
#[derive(Debug)]
pub struct ScoringRun {
    pub matrix: FeatureMatrix,
    pub model: CreditModel,
    /// Ranked by credit score, highest first.
    pub scores: Vec<WalletScore>,
}

impl ScoringRun {
    pub fn dropped_columns(&self) -> &[String] {
        &self.model.scaler.dropped
    }
}

/// Orchestrates one batch scoring run:
/// 1. Load and validate the transaction log
/// 2. Per-wallet feature extraction
/// 3. Fit scaler + isolation forest and map to credit scores
/// 4. Write score table, analysis report and (optionally) the model
///
/// Outputs are only written after step 3 succeeds for every wallet, and a
/// failure in step 4 leaves none of them behind.
pub struct ScoringPipeline {
    scorer: CreditScorer,
    output: OutputConfig,
}

impl ScoringPipeline {
    pub fn new(config: &Config) -> Self {
        Self {
            scorer: CreditScorer::new(config.model.clone()),
            output: config.output.clone(),
        }
    }

    /// Pure part of the run: features, fit and scores.
    pub fn score(&self, records: &[TransactionRecord]) -> ScoreResult<ScoringRun> {
        let features = extract_features(records);
        let matrix = FeatureMatrix::from_features(&features);
        let (model, scores) = self.scorer.fit_and_score(&matrix)?;
        Ok(ScoringRun {
            matrix,
            model,
            scores,
        })
    }

    /// Full run from the input log on disk to the output files.
    pub fn run(&self, input_path: &str) -> eyre::Result<RunSummary> {
        let log = load_transactions(input_path)?;
        let run = self.score(&log.records)?;
        self.write_outputs(&run)?;

        let summary = RunSummary {
            transactions: log.records.len() as u64,
            skipped_lines: log.skipped_lines as u64,
            wallets_scored: run.scores.len() as u64,
            features_used: run.model.scaler.columns.len() as u64,
            features_dropped: run.dropped_columns().len() as u64,
        };
        tracing::info!(
            transactions = summary.transactions,
            wallets = summary.wallets_scored,
            features = summary.features_used,
            dropped = summary.features_dropped,
            "Scoring run complete"
        );
        Ok(summary)
    }

    /// Render every output in memory, then place them all or none.
    pub fn write_outputs(&self, run: &ScoringRun) -> eyre::Result<()> {
        let columns = CsvColumns {
            raw_score: self.output.include_raw_score,
            features: self.output.include_features,
        };
        let scores_csv = render_scores_csv(&self.output.scores_path, &run.scores, &run.matrix, columns)?;
        let report = render_analysis(&run.matrix, &run.scores, run.dropped_columns());
        let model_json = match &self.output.model_path {
            Some(_) => Some(run.model.to_json()?),
            None => None,
        };

        let mut outputs: Vec<(&str, &[u8])> = vec![
            (self.output.scores_path.as_str(), scores_csv.as_slice()),
            (self.output.analysis_path.as_str(), report.as_bytes()),
        ];
        if let (Some(path), Some(json)) = (&self.output.model_path, &model_json) {
            outputs.push((path.as_str(), json.as_bytes()));
        }
        write_all_or_nothing(&outputs)?;

        tracing::info!(
            scores = %self.output.scores_path,
            analysis = %self.output.analysis_path,
            rows = run.scores.len(),
            "Outputs written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::Action;
    use chrono::{TimeZone, Utc};

    fn record(wallet: &str, action: Action, usd: f64, secs: i64) -> TransactionRecord {
        TransactionRecord {
            wallet_address: wallet.to_string(),
            action,
            usd_amount: usd,
            timestamp: Utc.timestamp_opt(1_620_000_000 + secs, 0).unwrap(),
            counterparty: None,
        }
    }

    #[test]
    fn test_every_wallet_scored_once() {
        let mut records = Vec::new();
        for w in 0..12 {
            let wallet = format!("0x{:02}", w);
            for i in 0..(w + 1) {
                records.push(record(&wallet, Action::Deposit, 100.0 * (i + 1) as f64, i * 3600));
            }
            if w % 4 == 0 {
                records.push(record(&wallet, Action::Borrow, 50.0, 99_999));
            }
        }

        let pipeline = ScoringPipeline::new(&Config::default());
        let run = pipeline.score(&records).unwrap();

        let mut wallets: Vec<_> = run.scores.iter().map(|s| s.wallet_address.clone()).collect();
        wallets.sort();
        let expected: Vec<_> = (0..12).map(|w| format!("0x{:02}", w)).collect();
        assert_eq!(wallets, expected);
        assert!(run.scores.iter().all(|s| s.credit_score <= 1000));
    }

    #[test]
    fn test_constant_columns_reported_as_dropped() {
        let records = vec![
            record("0xa", Action::Deposit, 10.0, 0),
            record("0xb", Action::Deposit, 20.0, 0),
            record("0xb", Action::Deposit, 20.0, 60),
            record("0xc", Action::Deposit, 5.0, 0),
        ];
        let run = ScoringPipeline::new(&Config::default()).score(&records).unwrap();
        let dropped = run.dropped_columns();
        assert!(dropped.contains(&"liquidation_count".to_string()));
        assert!(dropped.contains(&"borrow_ratio".to_string()));
        assert!(!dropped.contains(&"total_txs".to_string()));
    }

    #[test]
    fn test_single_wallet_fails() {
        let records = vec![
            record("0xa", Action::Deposit, 10.0, 0),
            record("0xa", Action::Borrow, 5.0, 10),
        ];
        let err = ScoringPipeline::new(&Config::default()).score(&records).unwrap_err();
        assert!(err.is_model());
    }
}
