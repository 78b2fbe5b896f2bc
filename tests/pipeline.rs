use std::collections::HashSet;

use serde_json::json;

use wallet_credit_score::config::Config;
use wallet_credit_score::features::extract_features;
use wallet_credit_score::ingest::parse_transactions;
use wallet_credit_score::pipeline::ScoringPipeline;
use wallet_credit_score::ScoreError;

const DAY: i64 = 86_400;
const T0: i64 = 1_625_000_000;

fn event(wallet: &str, action: &str, usd: f64, ts: i64) -> serde_json::Value {
    json!({
        "wallet_address": wallet,
        "action": action,
        "usd_amount": usd,
        "timestamp": ts,
        "counterparty": format!("pool-{}", action),
    })
}

/// Forty long-lived depositors plus two named wallets: A, a patient
/// depositor over 300 days who fits in with the crowd, and B, a wallet
/// liquidated three times inside one day.
fn population_log() -> Vec<serde_json::Value> {
    let mut log = Vec::new();

    for i in 0..50 {
        log.push(event("A", "deposit", 1_000.0, T0 + i * 300 * DAY / 49));
    }

    log.push(event("B", "deposit", 5_000.0, T0));
    log.push(event("B", "borrow", 4_000.0, T0 + 600));
    for i in 0..3 {
        log.push(event("B", "liquidationcall", 1_500.0, T0 + 3_600 * (i + 1)));
    }

    for w in 0..40 {
        let wallet = format!("0x{:04x}", w);
        let n = 35 + (w % 25);
        let span_days = 250 + (w * 7) % 100;
        for i in 0..n {
            let action = if w % 2 == 0 && i % 10 == 9 { "borrow" } else { "deposit" };
            let usd = 900.0 + 20.0 * ((w + i) % 11) as f64;
            log.push(event(&wallet, action, usd, T0 + i * span_days * DAY / (n - 1)));
        }
    }
    log
}

fn to_jsonl(values: &[serde_json::Value]) -> String {
    values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("\n")
}

fn test_config(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.input.path = dir.join("transactions.json").to_string_lossy().into_owned();
    config.output.scores_path = dir.join("out/wallet_scores.csv").to_string_lossy().into_owned();
    config.output.analysis_path = dir.join("analysis.md").to_string_lossy().into_owned();
    config
}

#[test]
fn test_depositor_outscores_liquidated_wallet() {
    let log = parse_transactions(&serde_json::to_string(&population_log()).unwrap()).unwrap();

    let features = extract_features(&log.records);
    assert_eq!(features["A"].liquidation_count, 0);
    assert_eq!(features["B"].liquidation_count, 3);
    assert!((features["A"].wallet_age_days - 300.0).abs() < 1e-6);
    assert!(features["B"].wallet_age_days <= 1.0);

    let run = ScoringPipeline::new(&Config::default()).score(&log.records).unwrap();
    let score_of = |w: &str| {
        run.scores
            .iter()
            .find(|s| s.wallet_address == w)
            .map(|s| s.credit_score)
            .unwrap()
    };
    assert!(score_of("A") > score_of("B"));
}

#[test]
fn test_same_input_same_scores() {
    let records = parse_transactions(&to_jsonl(&population_log())).unwrap().records;
    let pipeline = ScoringPipeline::new(&Config::default());
    let first = pipeline.score(&records).unwrap();
    let second = pipeline.score(&records).unwrap();
    assert_eq!(first.scores, second.scores);

    let mut reversed = records.clone();
    reversed.reverse();
    let third = pipeline.score(&reversed).unwrap();
    assert_eq!(first.scores, third.scores);
}

#[test]
fn test_coverage_bounds_and_extremes() {
    let records = parse_transactions(&to_jsonl(&population_log())).unwrap().records;
    let run = ScoringPipeline::new(&Config::default()).score(&records).unwrap();

    let input: HashSet<&str> = records.iter().map(|r| r.wallet_address.as_str()).collect();
    let output: HashSet<&str> = run.scores.iter().map(|s| s.wallet_address.as_str()).collect();
    assert_eq!(input, output);
    assert_eq!(run.scores.len(), input.len());
    assert!(run.scores.iter().all(|s| s.credit_score <= 1000));

    let most_anomalous = run
        .scores
        .iter()
        .min_by(|a, b| a.raw_anomaly_score.total_cmp(&b.raw_anomaly_score))
        .unwrap();
    let least_anomalous = run
        .scores
        .iter()
        .max_by(|a, b| a.raw_anomaly_score.total_cmp(&b.raw_anomaly_score))
        .unwrap();
    assert_eq!(most_anomalous.credit_score, 0);
    assert_eq!(least_anomalous.credit_score, 1000);
}

#[test]
fn test_full_run_writes_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.output.model_path = Some(dir.path().join("model.json").to_string_lossy().into_owned());
    std::fs::write(&config.input.path, serde_json::to_string(&population_log()).unwrap()).unwrap();

    let summary = ScoringPipeline::new(&config).run(&config.input.path).unwrap();
    assert_eq!(summary.wallets_scored, 42);

    let csv = std::fs::read_to_string(&config.output.scores_path).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("wallet_address,credit_score,raw_anomaly_score"));
    assert_eq!(lines.count(), 42);

    let report = std::fs::read_to_string(&config.output.analysis_path).unwrap();
    assert!(report.contains("## Feature Correlations"));
    assert!(std::path::Path::new(config.output.model_path.as_ref().unwrap()).exists());
}

#[test]
fn test_missing_wallet_aborts_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let mut log = population_log();
    log.insert(5, json!({"action": "deposit", "usd_amount": 10.0, "timestamp": T0}));
    std::fs::write(&config.input.path, serde_json::to_string(&log).unwrap()).unwrap();

    let err = ScoringPipeline::new(&config).run(&config.input.path).unwrap_err();
    let score_err = err.downcast_ref::<ScoreError>().unwrap();
    assert!(matches!(score_err, ScoreError::Data { index: 5, .. }));

    assert!(!std::path::Path::new(&config.output.scores_path).exists());
    assert!(!std::path::Path::new(&config.output.analysis_path).exists());
}

#[test]
fn test_single_wallet_is_model_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let log = vec![event("solo", "deposit", 10.0, T0), event("solo", "borrow", 5.0, T0 + DAY)];
    std::fs::write(&config.input.path, to_jsonl(&log)).unwrap();

    let err = ScoringPipeline::new(&config).run(&config.input.path).unwrap_err();
    assert!(err.downcast_ref::<ScoreError>().unwrap().is_model());
    assert!(!std::path::Path::new(&config.output.scores_path).exists());
}

#[test]
fn test_failed_write_leaves_no_scores_behind() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.output.model_path = Some(dir.path().join("model.json").to_string_lossy().into_owned());
    std::fs::write(&config.input.path, to_jsonl(&population_log())).unwrap();

    // The report path is taken by a directory, so the report cannot be placed.
    std::fs::create_dir(&config.output.analysis_path).unwrap();

    let result = ScoringPipeline::new(&config).run(&config.input.path);
    assert!(result.is_err());

    assert!(!std::path::Path::new(&config.output.scores_path).exists());
    assert!(!std::path::Path::new(config.output.model_path.as_ref().unwrap()).exists());
    assert!(std::path::Path::new(&config.output.analysis_path).is_dir());
    let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("out"))
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert!(leftovers.is_empty(), "unexpected files: {:?}", leftovers);
    let temps = std::fs::read_dir(dir.path())
        .unwrap()
        .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().ends_with(".tmp"))
        .count();
    assert_eq!(temps, 0);
}
